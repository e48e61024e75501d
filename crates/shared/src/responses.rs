//! Result codes carried by reply payloads

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP-like outcome of a request. `0` means "not a reply".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub u16);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(200);
    /// The session is in the wrong state or the request is malformed
    pub const BAD_REQUEST: ResultCode = ResultCode(400);
    /// Bad credentials, or the world is full
    pub const FORBIDDEN: ResultCode = ResultCode(403);
    pub const NOT_FOUND: ResultCode = ResultCode(404);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payloads that carry a `result` text and a `result_code`.
pub trait Reply: Sized {
    fn set_result(&mut self, code: ResultCode, result: String);

    fn respond(mut self, code: ResultCode, result: impl Into<String>) -> Self {
        self.set_result(code, result.into());
        self
    }
}

macro_rules! impl_reply {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::responses::Reply for $ty {
                fn set_result(&mut self, code: $crate::responses::ResultCode, result: String) {
                    self.result_code = code;
                    self.result = result;
                }
            }
        )+
    };
}

pub(crate) use impl_reply;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_is_a_bare_number_on_the_wire() {
        assert_eq!(serde_json::to_string(&ResultCode::FORBIDDEN).unwrap(), "403");
        assert_eq!(
            serde_json::from_str::<ResultCode>("404").unwrap(),
            ResultCode::NOT_FOUND
        );
        assert!(ResultCode::OK.is_ok());
        assert!(!ResultCode::default().is_ok());
    }
}
