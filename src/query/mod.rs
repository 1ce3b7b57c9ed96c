pub mod channel;

use failure::Fail;

pub const NAMESPACE: &'static str = "live";

/// One value in a request or response sequence.
///
/// The remote protocol only ever moves flat sequences of scalars around,
/// so this is the whole wire data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  Int(i64),
  Float(f64),
  Str(String),
  Bool(bool),
}

impl Scalar {
  pub fn as_int(&self) -> Option<i64> {
    match self {
      Scalar::Int(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_float(&self) -> Option<f64> {
    match self {
      Scalar::Float(value) => Some(*value),
      Scalar::Int(value) => Some(*value as f64),
      _ => None,
    }
  }

  // The remote encodes booleans as integers more often than not
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Scalar::Bool(value) => Some(*value),
      Scalar::Int(value) => Some(*value != 0),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Scalar::Str(value) => Some(value.as_str()),
      _ => None,
    }
  }
}

impl From<i64> for Scalar {
  fn from(value: i64) -> Scalar {
    Scalar::Int(value)
  }
}

impl From<i32> for Scalar {
  fn from(value: i32) -> Scalar {
    Scalar::Int(i64::from(value))
  }
}

impl From<u32> for Scalar {
  fn from(value: u32) -> Scalar {
    Scalar::Int(i64::from(value))
  }
}

impl From<u8> for Scalar {
  fn from(value: u8) -> Scalar {
    Scalar::Int(i64::from(value))
  }
}

impl From<usize> for Scalar {
  fn from(value: usize) -> Scalar {
    Scalar::Int(value as i64)
  }
}

impl From<f64> for Scalar {
  fn from(value: f64) -> Scalar {
    Scalar::Float(value)
  }
}

impl From<bool> for Scalar {
  fn from(value: bool) -> Scalar {
    Scalar::Bool(value)
  }
}

impl<'a> From<&'a str> for Scalar {
  fn from(value: &'a str) -> Scalar {
    Scalar::Str(value.to_string())
  }
}

impl From<String> for Scalar {
  fn from(value: String) -> Scalar {
    Scalar::Str(value)
  }
}

pub trait FromScalar: Sized {
  fn from_scalar(value: &Scalar) -> Option<Self>;
}

impl FromScalar for i64 {
  fn from_scalar(value: &Scalar) -> Option<i64> {
    value.as_int()
  }
}

impl FromScalar for i32 {
  fn from_scalar(value: &Scalar) -> Option<i32> {
    value.as_int().map(|value| value as i32)
  }
}

impl FromScalar for u32 {
  fn from_scalar(value: &Scalar) -> Option<u32> {
    value.as_int().map(|value| value as u32)
  }
}

impl FromScalar for u8 {
  fn from_scalar(value: &Scalar) -> Option<u8> {
    value.as_int().map(|value| value as u8)
  }
}

impl FromScalar for f64 {
  fn from_scalar(value: &Scalar) -> Option<f64> {
    value.as_float()
  }
}

impl FromScalar for bool {
  fn from_scalar(value: &Scalar) -> Option<bool> {
    value.as_bool()
  }
}

impl FromScalar for String {
  fn from_scalar(value: &Scalar) -> Option<String> {
    value.as_str().map(str::to_string)
  }
}

#[derive(Debug, Fail)]
pub enum QueryError {
  #[fail(display = "Timed out waiting for a response to {}", path)]
  Timeout { path: String },

  #[fail(display = "Remote connection lost: {}", cause)]
  Disconnected { cause: String },

  #[fail(
    display = "Malformed response for {}: expected at least {} values, got {}",
    path, expected, actual
  )]
  ShapeMismatch {
    path: String,
    expected: usize,
    actual: usize,
  },

  #[fail(display = "Unexpected value type in response for {}: {:?}", path, value)]
  TypeMismatch { path: String, value: Scalar },
}

/// The connection to the remote application.
///
/// Both calls block until the transport has done its work. Timeouts,
/// framing and request/response correlation are the implementation's
/// business; proxies only format paths and argument sequences.
pub trait Transport: Send + Sync {
  fn query(&self, path: &str, args: &[Scalar]) -> Result<Vec<Scalar>, QueryError>;

  fn cmd(&self, path: &str, args: &[Scalar]) -> Result<(), QueryError>;
}

pub fn object_path(class_identifier: &str, verb: &str, prop: &str) -> String {
  format!("/{}/{}/{}/{}", NAMESPACE, class_identifier, verb, prop)
}

pub fn decode<T>(path: &str, value: &Scalar) -> Result<T, QueryError>
where
  T: FromScalar,
{
  T::from_scalar(value).ok_or_else(|| QueryError::TypeMismatch {
    path: path.to_string(),
    value: value.clone(),
  })
}
