use bitflags::bitflags;

use super::TypeToken;

bitflags! {
    /// Closed set of per-parameter modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamModifiers: u16 {
        /// `NULL` is an accepted argument.
        const NULLABLE = 1 << 0;
        /// Read by the callee.
        const INPUT = 1 << 1;
        /// Written by the callee.
        const OUTPUT = 1 << 2;
        /// Pointee is `const`.
        const CONST = 1 << 3;
        /// Two or more levels of indirection.
        const POINTER_TO_POINTER = 1 << 4;
        /// Value is the element count of a sibling's buffer.
        const LENGTH_CARRIER = 1 << 5;
        /// Buffer whose element count is carried by a sibling.
        const ARRAY = 1 << 6;
        /// Buffer terminated by a zero/`NULL` element.
        const NULL_TERMINATED = 1 << 7;
        /// Buffer whose filled length is the function's return value.
        const RETURNED_LENGTH = 1 << 8;
    }
}

impl ParamModifiers {
    /// Flags implied by the shape of a type token.
    #[must_use]
    pub fn derived_from(token: &TypeToken) -> Self {
        let mut flags = Self::empty();
        if token.is_const && token.pointer_depth > 0 {
            flags |= Self::CONST;
        }
        if token.pointer_depth >= 2 {
            flags |= Self::POINTER_TO_POINTER;
        }
        flags
    }

    /// Parse a modifier keyword as written in descriptors.
    pub fn parse_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "nullable" => Some(Self::NULLABLE),
            "in" | "input" => Some(Self::INPUT),
            "out" | "output" => Some(Self::OUTPUT),
            "inout" => Some(Self::INPUT | Self::OUTPUT),
            "const" => Some(Self::CONST),
            "null_terminated" | "none_terminated" => Some(Self::NULL_TERMINATED),
            _ => None,
        }
    }

    /// Keywords for documentation output, in flag order.
    #[must_use]
    pub fn keywords(self) -> Vec<&'static str> {
        let mut words = Vec::new();
        for (flag, word) in [
            (Self::NULLABLE, "nullable"),
            (Self::INPUT, "in"),
            (Self::OUTPUT, "out"),
            (Self::CONST, "const"),
            (Self::POINTER_TO_POINTER, "pointer-to-pointer"),
            (Self::LENGTH_CARRIER, "length"),
            (Self::ARRAY, "array"),
            (Self::NULL_TERMINATED, "null-terminated"),
            (Self::RETURNED_LENGTH, "returned-length"),
        ] {
            if self.contains(flag) {
                words.push(word);
            }
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags_follow_token_shape() {
        let token = TypeToken::parse("const char * const *").unwrap();
        let flags = ParamModifiers::derived_from(&token);
        assert!(flags.contains(ParamModifiers::CONST));
        assert!(flags.contains(ParamModifiers::POINTER_TO_POINTER));

        let scalar = TypeToken::parse("const uint32_t").unwrap();
        assert!(ParamModifiers::derived_from(&scalar).is_empty());
    }

    #[test]
    fn keywords_round_out_flag_names() {
        assert_eq!(
            ParamModifiers::parse_keyword("INOUT"),
            Some(ParamModifiers::INPUT | ParamModifiers::OUTPUT)
        );
        assert_eq!(ParamModifiers::parse_keyword("sideways"), None);
        let flags = ParamModifiers::NULLABLE | ParamModifiers::OUTPUT;
        assert_eq!(flags.keywords(), vec!["nullable", "out"]);
        let returned = ParamModifiers::ARRAY | ParamModifiers::RETURNED_LENGTH;
        assert_eq!(returned.keywords(), vec!["array", "returned-length"]);
    }
}
