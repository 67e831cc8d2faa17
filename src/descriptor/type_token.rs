use std::error::Error as StdError;
use std::fmt;

/// Native type name plus pointer/const qualification, parsed from C-like text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeToken {
    pub base: String,
    pub pointer_depth: u8,
    /// The innermost pointee (or the value itself) is `const`.
    pub is_const: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTokenError {
    pub text: String,
    pub message: String,
}

impl fmt::Display for TypeTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid type `{}`: {}", self.text, self.message)
    }
}

impl StdError for TypeTokenError {}

impl TypeToken {
    #[must_use]
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            pointer_depth: 0,
            is_const: false,
        }
    }

    #[must_use]
    pub fn void() -> Self {
        Self::named("void")
    }

    #[must_use]
    pub fn pointer(mut self) -> Self {
        self.pointer_depth = self.pointer_depth.saturating_add(1);
        self
    }

    #[must_use]
    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.pointer_depth == 0 && self.base == "void"
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// Token for the value one level of indirection down.
    #[must_use]
    pub fn pointee(&self) -> Option<Self> {
        (self.pointer_depth > 0).then(|| Self {
            base: self.base.clone(),
            pointer_depth: self.pointer_depth - 1,
            is_const: self.is_const,
        })
    }

    /// Parse `uint32_t`, `const VkFoo *`, `char const * const *`, `unsigned long long`.
    ///
    /// `struct`/`enum` tags are dropped and `const` after a `*` (a const pointer) carries no
    /// meaning for bindings, so it is accepted and ignored.
    ///
    /// # Errors
    /// Returns a [`TypeTokenError`] when the text does not describe a type.
    pub fn parse(text: &str) -> Result<Self, TypeTokenError> {
        let error = |message: &str| TypeTokenError {
            text: text.to_string(),
            message: message.to_string(),
        };

        let spaced = text.replace('*', " * ");
        let mut base_words: Vec<&str> = Vec::new();
        let mut pointer_depth: u8 = 0;
        let mut is_const = false;

        for word in spaced.split_whitespace() {
            match word {
                "*" => {
                    if base_words.is_empty() {
                        return Err(error("pointer declarator before a type name"));
                    }
                    pointer_depth = pointer_depth
                        .checked_add(1)
                        .ok_or_else(|| error("too many levels of indirection"))?;
                }
                "const" => {
                    if pointer_depth == 0 {
                        is_const = true;
                    }
                }
                "struct" | "enum" | "union" if base_words.is_empty() && pointer_depth == 0 => {}
                _ if pointer_depth > 0 => {
                    return Err(error("unexpected name after pointer declarator"));
                }
                _ if !is_identifier(word) => {
                    return Err(error("type names must be identifiers"));
                }
                _ => base_words.push(word),
            }
        }

        if base_words.is_empty() {
            return Err(error("missing type name"));
        }
        if base_words.len() > 1 && !base_words.iter().all(|word| is_builtin_keyword(word)) {
            return Err(error("multi-word types must be built-in C types"));
        }

        Ok(Self {
            base: base_words.join(" "),
            pointer_depth,
            is_const,
        })
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn is_builtin_keyword(word: &str) -> bool {
    matches!(
        word,
        "unsigned" | "signed" | "long" | "short" | "int" | "char" | "double"
    )
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let const_prefix = if self.is_const { "const " } else { "" };
        if self.pointer_depth == 0 {
            write!(f, "{const_prefix}{}", self.base)
        } else {
            let stars = "*".repeat(usize::from(self.pointer_depth));
            write!(f, "{const_prefix}{} {stars}", self.base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qualified_pointers() {
        let token = TypeToken::parse("const VkViewport*").unwrap();
        assert_eq!(token.base, "VkViewport");
        assert_eq!(token.pointer_depth, 1);
        assert!(token.is_const);

        let token = TypeToken::parse("char const * const *").unwrap();
        assert_eq!(token.base, "char");
        assert_eq!(token.pointer_depth, 2);
        assert!(token.is_const);
    }

    #[test]
    fn keeps_multi_word_builtins_together() {
        let token = TypeToken::parse("unsigned long long").unwrap();
        assert_eq!(token.base, "unsigned long long");
        assert_eq!(token.to_string(), "unsigned long long");
    }

    #[test]
    fn drops_struct_tags() {
        let token = TypeToken::parse("struct HmdColor_t *").unwrap();
        assert_eq!(token.base, "HmdColor_t");
        assert_eq!(token.to_string(), "HmdColor_t *");
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(TypeToken::parse("").is_err());
        assert!(TypeToken::parse("* int").is_err());
        assert!(TypeToken::parse("int * foo").is_err());
        assert!(TypeToken::parse("Foo Bar").is_err());
        assert!(TypeToken::parse("int[4]").is_err());
    }

    #[test]
    fn pointee_strips_one_level() {
        let token = TypeToken::parse("void **").unwrap();
        let pointee = token.pointee().unwrap();
        assert_eq!(pointee.pointer_depth, 1);
        assert!(pointee.pointee().unwrap().is_void());
        assert!(TypeToken::void().pointee().is_none());
    }
}
