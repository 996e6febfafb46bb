use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a value that must never show up in log output.
///
/// `Debug` and `Display` print a fixed mask. Serialization still emits the real
/// value, since API responses are the one place the holder is meant to see it.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_masked_but_json_is_not() {
        let code = Masked("9f86d081884c7d65".to_string());

        assert_eq!(format!("{:?}", code), "********");
        assert_eq!(format!("{}", code), "********");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"9f86d081884c7d65\"");
        assert_eq!(code.expose(), "9f86d081884c7d65");
    }
}
