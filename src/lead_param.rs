use crate::marks::MarkId;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum LeadParam {
    /// No leading parameter.
    None,
    /// + without integer (e.g. `+CMD`)
    Plus,
    /// - without integer (e.g. `-CMD`)
    Minus,
    /// Positive integer (e.g. `3` or `+3`)
    Pint(usize),
    /// Negative integer (e.g. `-3`)
    Nint(usize),
    /// Indefinite positive (`>` or `.`), typically to end of line or file
    Pindef,
    /// Indefinite negative (`<` or `,`), typically to start of line or file
    Nindef,
    /// Marker (e.g. `@n`, `=`, or `%`)
    Marker(MarkId),
}

/// The shape of a leading parameter, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LeadParamKind {
    None = 0,
    Plus = 1,
    Minus = 2,
    Pint = 3,
    Nint = 4,
    Pindef = 5,
    Nindef = 6,
    Marker = 7,
}

/// Builds a bit set of allowed [`LeadParamKind`]s.
#[macro_export]
macro_rules! lead_param_mask {
    ($($kind:ident),* $(,)?) => {
        0u8 $(| (1u8 << ($crate::lead_param::LeadParamKind::$kind as u8)))*
    };
}

pub const LP_ALL: u8 = lead_param_mask!(None, Plus, Minus, Pint, Nint, Pindef, Nindef, Marker);

impl LeadParam {
    pub fn kind(&self) -> LeadParamKind {
        match self {
            LeadParam::None => LeadParamKind::None,
            LeadParam::Plus => LeadParamKind::Plus,
            LeadParam::Minus => LeadParamKind::Minus,
            LeadParam::Pint(_) => LeadParamKind::Pint,
            LeadParam::Nint(_) => LeadParamKind::Nint,
            LeadParam::Pindef => LeadParamKind::Pindef,
            LeadParam::Nindef => LeadParamKind::Nindef,
            LeadParam::Marker(_) => LeadParamKind::Marker,
        }
    }

    pub fn allowed_by(&self, mask: u8) -> bool {
        mask & (1u8 << (self.kind() as u8)) != 0
    }

    /// True for the forms that count or run forwards.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) | LeadParam::Pindef
        )
    }

    /// The finite count this parameter denotes, if any.
    pub fn count(&self) -> Option<usize> {
        match self {
            LeadParam::None | LeadParam::Plus | LeadParam::Minus => Some(1),
            LeadParam::Pint(n) | LeadParam::Nint(n) => Some(*n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        let mask = lead_param_mask!(None, Pint);
        assert!(LeadParam::None.allowed_by(mask));
        assert!(LeadParam::Pint(4).allowed_by(mask));
        assert!(!LeadParam::Minus.allowed_by(mask));
        assert!(LeadParam::Marker(MarkId::Equals).allowed_by(LP_ALL));
    }

    #[test]
    fn test_count() {
        assert_eq!(LeadParam::None.count(), Some(1));
        assert_eq!(LeadParam::Nint(3).count(), Some(3));
        assert_eq!(LeadParam::Pindef.count(), None);
        assert!(LeadParam::Pindef.is_positive());
        assert!(!LeadParam::Nint(2).is_positive());
    }
}
