//! Key bindings for interactive mode.
//!
//! Maps keys to Ludwig commands.  A binding is either a single primitive
//! with its trailing parameters, or compiled code run through the
//! interpreter.

use std::collections::HashMap;

use tracing::debug;

use crate::code::{CmdOp, CodeArena, CodeRef};
use crate::lead_param::LeadParam;
use crate::terminal::Key;
use crate::trail_param::TrailParam;

/// What a key does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub op: CmdOp,
    pub tpars: Vec<TrailParam>,
    /// Code run when `op` is [`CmdOp::Extended`].  The binding owns one
    /// reference to it.
    pub code: Option<CodeRef>,
}

impl KeyBinding {
    pub fn simple(op: CmdOp) -> Self {
        Self {
            op,
            tpars: Vec::new(),
            code: None,
        }
    }

    /// Turns freshly compiled code into a binding, taking over its reference.
    /// A body of one plain primitive with no leading parameter is bound
    /// directly and the code is released.
    pub fn from_code(arena: &mut CodeArena, code: CodeRef) -> Self {
        if let [instr] = arena.instructions(code)
            && instr.rep == LeadParam::None
            && instr.label == 0
            && !instr.op.is_intrinsic()
        {
            let binding = Self {
                op: instr.op,
                tpars: instr.tpars.clone(),
                code: None,
            };
            arena.discard(code);
            return binding;
        }
        Self {
            op: CmdOp::Extended,
            tpars: Vec::new(),
            code: Some(code),
        }
    }
}

/// Default key bindings, as command text compiled at start-up.
pub const DEFAULT_BINDINGS: [(Key, &str); 11] = [
    (Key::Up, "ZU"),
    (Key::Down, "ZD"),
    (Key::Left, "ZL"),
    (Key::Right, "ZR"),
    (Key::Home, "ZH"),
    (Key::End, ">ZR"),
    (Key::Backspace, "ZZ"),
    (Key::Delete, "D"),
    (Key::Enter, "ZC"),
    (Key::PageUp, "WB"),
    (Key::PageDown, "WF"),
];

/// The key lookup table and the command introducer.
#[derive(Debug)]
pub struct KeyTable {
    bindings: HashMap<Key, KeyBinding>,
    introducer: Key,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
            introducer: Key::Escape,
        }
    }
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: Key) -> Option<&KeyBinding> {
        self.bindings.get(&key)
    }

    /// Binds `key`, releasing whatever code it was bound to before.
    pub fn bind(&mut self, arena: &mut CodeArena, key: Key, binding: KeyBinding) {
        debug!(%key, op = ?binding.op, "key bound");
        if let Some(old) = self.bindings.insert(key, binding)
            && let Some(code) = old.code
        {
            arena.discard(code);
        }
    }

    pub fn unbind(&mut self, arena: &mut CodeArena, key: Key) {
        if let Some(old) = self.bindings.remove(&key)
            && let Some(code) = old.code
        {
            arena.discard(code);
        }
    }

    pub fn introducer(&self) -> Key {
        self.introducer
    }

    pub fn set_introducer(&mut self, key: Key) {
        self.introducer = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Instruction;

    fn insert_x(arena: &mut CodeArena, rep: LeadParam) -> CodeRef {
        let mut instr = Instruction::new(CmdOp::InsertText, rep);
        instr.tpars.push(TrailParam::new('/', "X"));
        arena.new_code(vec![instr])
    }

    #[test]
    fn test_plain_primitive_binds_directly() {
        let mut arena = CodeArena::new();
        let code = insert_x(&mut arena, LeadParam::None);
        let binding = KeyBinding::from_code(&mut arena, code);
        assert_eq!(binding.op, CmdOp::InsertText);
        assert_eq!(binding.tpars, vec![TrailParam::new('/', "X")]);
        assert_eq!(binding.code, None);
        assert_eq!(arena.live_codes(), 0);
    }

    #[test]
    fn test_counted_command_binds_code() {
        let mut arena = CodeArena::new();
        let code = insert_x(&mut arena, LeadParam::Pint(3));
        let binding = KeyBinding::from_code(&mut arena, code);
        assert_eq!(binding.op, CmdOp::Extended);
        assert_eq!(binding.code, Some(code));
        assert_eq!(arena.refs(code), 1);
    }

    #[test]
    fn test_rebinding_releases_old_code() {
        let mut arena = CodeArena::new();
        let mut keys = KeyTable::new();
        let first = insert_x(&mut arena, LeadParam::Pint(3));
        let binding = KeyBinding::from_code(&mut arena, first);
        keys.bind(&mut arena, Key::F(1), binding);
        assert_eq!(arena.live_codes(), 1);

        let second = insert_x(&mut arena, LeadParam::Pint(4));
        let binding = KeyBinding::from_code(&mut arena, second);
        keys.bind(&mut arena, Key::F(1), binding);
        assert_eq!(arena.live_codes(), 1);
        assert_eq!(keys.get(Key::F(1)).and_then(|b| b.code), Some(second));
        assert!(arena.is_compact());

        keys.unbind(&mut arena, Key::F(1));
        assert_eq!(arena.live_codes(), 0);
    }

    #[test]
    fn test_introducer() {
        let mut keys = KeyTable::new();
        assert_eq!(keys.introducer(), Key::Escape);
        keys.set_introducer(Key::F(2));
        assert_eq!(keys.introducer(), Key::F(2));
    }
}
