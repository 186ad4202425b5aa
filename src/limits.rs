//! Fixed limits of the command engine.

/// Longest line, in characters.
pub const MAX_STRLEN: usize = 400;

/// Maximum number of lines held by one group.
pub const MAX_GROUP_LINES: usize = 64;

/// Line capacity is allocated in multiples of this.
pub const LINE_QUANTUM: usize = 10;

/// Largest count accepted as a leading parameter.
pub const MAX_COUNT: usize = 65535;

/// Number of user marks (`@1` to `@9`).
pub const MAX_USER_MARK: u8 = 9;

/// Nesting depth of compound commands at run time.
pub const MAX_LEVEL: usize = 100;

/// Distinct verify commands per compiled code.
pub const MAX_VERIFY: usize = 256;

/// Depth of trailing-parameter substitution.
pub const MAX_TPAR_RECURSION: usize = 100;

/// Depth of nested span execution.
pub const MAX_EXEC_RECURSION: usize = 100;

/// Longest span or frame name.
pub const MAX_NAME_LEN: usize = 31;

/// Default per-frame text budget, in characters of line capacity.
pub const DEFAULT_SPACE_LIMIT: usize = 1_000_000;

/// Default right margin for new frames.
pub const DEFAULT_MARGIN_RIGHT: usize = 80;
