use crate::codec;
use crate::error::{BridgeError, Result};

use super::tokens::{FieldKind, Token};

/// A decoded field. The variant always matches the kind of the token it was
/// read for.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Double(f64),
    Integer(i32),
    TextArray(Vec<String>),
    DoubleArray(Vec<f64>),
    IntegerArray(Vec<i32>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Double(_) => FieldKind::Double,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::TextArray(_) => FieldKind::TextArray,
            FieldValue::DoubleArray(_) => FieldKind::DoubleArray,
            FieldValue::IntegerArray(_) => FieldKind::IntegerArray,
        }
    }

    /// Decodes an output buffer the engine filled for a field of `kind`.
    pub fn decode(kind: FieldKind, buf: &[u8]) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(codec::decode_str(buf)),
            FieldKind::Double => FieldValue::Double(codec::decode_f64(buf)),
            FieldKind::Integer => FieldValue::Integer(codec::decode_i32(buf)),
            FieldKind::TextArray => FieldValue::TextArray(codec::decode_str_array(buf)),
            FieldKind::DoubleArray => FieldValue::DoubleArray(codec::decode_f64_array(buf)),
            FieldKind::IntegerArray => FieldValue::IntegerArray(codec::decode_i32_array(buf)),
        }
    }

    /// Input buffer for `SetDataEx`. Only scalar kinds can be written.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            FieldValue::Text(s) => codec::encode_str(s),
            FieldValue::Double(d) => Ok(codec::encode_f64(*d).to_vec()),
            FieldValue::Integer(i) => Ok(codec::encode_i32(*i).to_vec()),
            other => Err(BridgeError::invalid(
                "SetData",
                format!("{} fields cannot be written", other.kind()),
            )),
        }
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v)
    }
}

/// A destination [`DataRow::scan`] can assign into. Assignment requires the
/// exact kind; there is no narrowing or widening.
pub trait FieldSlot {
    fn kind(&self) -> FieldKind;
    fn assign(&mut self, value: &FieldValue);
}

macro_rules! field_slot {
    ($ty:ty, $variant:ident) => {
        impl FieldSlot for $ty {
            fn kind(&self) -> FieldKind {
                FieldKind::$variant
            }

            fn assign(&mut self, value: &FieldValue) {
                if let FieldValue::$variant(v) = value {
                    *self = v.clone();
                }
            }
        }
    };
}

field_slot!(String, Text);
field_slot!(f64, Double);
field_slot!(i32, Integer);
field_slot!(Vec<String>, TextArray);
field_slot!(Vec<f64>, DoubleArray);
field_slot!(Vec<i32>, IntegerArray);

/// Result of a multi-token `get_data`. Every token is attempted; the first
/// per-token error is kept and surfaces from [`DataRow::scan`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    tokens: Vec<Token>,
    values: Vec<Option<FieldValue>>,
    error: Option<BridgeError>,
}

impl DataRow {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
            error: None,
        }
    }

    pub(crate) fn push(&mut self, token: Token, value: Result<FieldValue>) {
        self.tokens.push(token);
        match value {
            Ok(v) => self.values.push(Some(v)),
            Err(e) => {
                self.values.push(None);
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Value decoded for the `i`-th token, `None` if that token failed.
    pub fn get(&self, i: usize) -> Option<&FieldValue> {
        self.values.get(i).and_then(Option::as_ref)
    }

    pub fn error(&self) -> Option<&BridgeError> {
        self.error.as_ref()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Assigns each value to the destination at the same position.
    ///
    /// Fails with the first recorded token error, then on a destination count
    /// mismatch, then on the first kind mismatch. Destinations are only
    /// written when every check passes.
    pub fn scan(&self, dest: &mut [&mut dyn FieldSlot]) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if dest.len() != self.values.len() {
            return Err(BridgeError::Encoding(format!(
                "scan expected {} destinations, got {}",
                self.values.len(),
                dest.len()
            )));
        }
        for (i, (slot, value)) in dest.iter().zip(&self.values).enumerate() {
            let Some(value) = value else {
                return Err(BridgeError::Encoding(format!("token {} has no value", self.tokens[i])));
            };
            if slot.kind() != value.kind() {
                return Err(BridgeError::Encoding(format!(
                    "token {} is a {} field, destination {} is {}",
                    self.tokens[i],
                    value.kind(),
                    i,
                    slot.kind()
                )));
            }
        }
        for (slot, value) in dest.iter_mut().zip(self.values.iter().flatten()) {
            slot.assign(value);
        }
        Ok(())
    }

    /// All values, or the first recorded error.
    pub fn into_values(self) -> Result<Vec<FieldValue>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.values.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tokens::*;

    fn row() -> DataRow {
        let mut row = DataRow::with_capacity(3);
        row.push(BUS_S_NAME, Ok(FieldValue::Text("NEVADA".into())));
        row.push(BUS_D_KV_NOMINAL, Ok(FieldValue::Double(132.0)));
        row.push(BUS_N_NUMBER, Ok(FieldValue::Integer(10)));
        row
    }

    #[test]
    fn test_scan_assigns_in_order() {
        let (mut name, mut kv, mut number) = (String::new(), 0.0_f64, 0_i32);
        row().scan(&mut [&mut name, &mut kv, &mut number]).unwrap();
        assert_eq!(name, "NEVADA");
        assert_eq!(kv, 132.0);
        assert_eq!(number, 10);
    }

    #[test]
    fn test_scan_count_mismatch() {
        let (mut name, mut kv) = (String::new(), 0.0_f64);
        let err = row().scan(&mut [&mut name, &mut kv]).unwrap_err();
        assert!(matches!(err, BridgeError::Encoding(_)));
        assert!(name.is_empty());
    }

    #[test]
    fn test_scan_no_narrowing() {
        let (mut name, mut kv, mut number) = (String::new(), 0_i32, 0_i32);
        let err = row().scan(&mut [&mut name, &mut kv, &mut number]).unwrap_err();
        assert!(err.to_string().contains("double"));
        assert!(name.is_empty());
    }

    #[test]
    fn test_first_error_wins_and_others_still_decode() {
        let mut row = DataRow::with_capacity(3);
        row.push(BUS_S_NAME, Ok(FieldValue::Text("OHIO".into())));
        row.push(Token(999), Err(BridgeError::UnknownToken(Token(999))));
        row.push(LN_V_D_RATING, Err(BridgeError::native("GetData", "bad handle")));

        assert_eq!(row.get(0), Some(&FieldValue::Text("OHIO".into())));
        assert_eq!(row.get(1), None);
        assert_eq!(row.error(), Some(&BridgeError::UnknownToken(Token(999))));

        let (mut a, mut b, mut c) = (String::new(), 0_i32, Vec::<f64>::new());
        let err = row.scan(&mut [&mut a, &mut b, &mut c]).unwrap_err();
        assert_eq!(err, BridgeError::UnknownToken(Token(999)));
    }

    #[test]
    fn test_encode_scalars_only() {
        assert_eq!(FieldValue::from(7).encode().unwrap(), vec![7, 0, 0, 0]);
        assert_eq!(FieldValue::from("A").encode().unwrap(), b"A\0".to_vec());
        let err = FieldValue::DoubleArray(vec![1.0]).encode().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    }

    #[test]
    fn test_decode_by_kind() {
        let buf = codec::encode_f64_array(&[1.5, 2.5]);
        assert_eq!(
            FieldValue::decode(FieldKind::DoubleArray, &buf),
            FieldValue::DoubleArray(vec![1.5, 2.5])
        );
        assert_eq!(
            FieldValue::decode(FieldKind::Integer, &codec::encode_i32(-3)),
            FieldValue::Integer(-3)
        );
    }
}
