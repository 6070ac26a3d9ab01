use tracing::debug;

use super::Session;
use crate::codec;
use crate::data::{DataRow, EquipmentType, FieldKind, FieldValue, Handle, Token};
use crate::error::{BridgeError, Result};
use crate::gate::Invoker;
use crate::native::{Arg, Procedure};

impl Session {
    /// Reads `tokens` of one object.
    ///
    /// Every token is attempted under a single lock acquisition. A failing
    /// token does not stop the others; its error is kept in the row and
    /// surfaces from [`DataRow::scan`].
    pub fn get_data(&self, handle: Handle, tokens: &[Token]) -> DataRow {
        let mut row = DataRow::with_capacity(tokens.len());
        self.gate.exclusive(|inv| {
            // Only array fields need the equipment type to size their buffer.
            let mut kind: Option<Result<EquipmentType>> = None;
            for &token in tokens {
                let value = self.read_field(inv, handle, token, &mut kind);
                row.push(token, value);
            }
        });
        if let Some(err) = row.error() {
            debug!(%handle, error = %err, "get_data recorded a token error");
        }
        row
    }

    fn read_field(
        &self,
        inv: &mut Invoker<'_>,
        handle: Handle,
        token: Token,
        equipment: &mut Option<Result<EquipmentType>>,
    ) -> Result<FieldValue> {
        let field = token.kind().ok_or(BridgeError::UnknownToken(token))?;
        let size = match field {
            FieldKind::Text | FieldKind::TextArray => codec::STRING_FIELD_LEN,
            FieldKind::Double => codec::DOUBLE_SIZE,
            FieldKind::Integer => codec::INT_SIZE,
            FieldKind::DoubleArray | FieldKind::IntegerArray => {
                let equipment = equipment
                    .get_or_insert_with(|| {
                        inv.invoke(Procedure::EquipmentType, &mut [Arg::Int(handle.raw())])
                            .require(Procedure::EquipmentType.name())
                            .map(EquipmentType)
                    })
                    .clone()?;
                let element = if field == FieldKind::DoubleArray {
                    codec::DOUBLE_SIZE
                } else {
                    codec::INT_SIZE
                };
                self.schema.length(equipment, token)? * element
            }
        };
        let mut buf = vec![0u8; size];
        inv.invoke(
            Procedure::GetData,
            &mut [Arg::Int(handle.raw()), Arg::Int(token.0), Arg::Out(&mut buf)],
        )
        .require(Procedure::GetData.name())?;
        Ok(FieldValue::decode(field, &buf))
    }

    /// Stages a write of one scalar field. Nothing changes in the model
    /// until [`Session::post_data`].
    ///
    /// The value must have exactly the token's kind.
    pub fn set_data(&self, handle: Handle, token: Token, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let kind = token.kind().ok_or(BridgeError::UnknownToken(token))?;
        if value.kind() != kind {
            return Err(BridgeError::invalid(
                Procedure::SetDataEx.name(),
                format!("token {token} is a {kind} field, value is {}", value.kind()),
            ));
        }
        let buf = value.encode()?;
        self.status(
            Procedure::SetDataEx,
            &mut [Arg::Int(handle.raw()), Arg::Int(token.0), Arg::In(&buf)],
        )
    }

    /// Commits the writes staged on `handle`.
    pub fn post_data(&self, handle: Handle) -> Result<()> {
        self.status(Procedure::PostData, &mut [Arg::Int(handle.raw())])
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::data::tokens::*;
    use crate::data::ArrayLengths;
    use crate::native::SimulatedEngine;

    fn session() -> (Session, crate::native::simulated::SimProbe) {
        let sim = SimulatedEngine::sample();
        let probe = sim.probe();
        (
            Session::with_engine(Box::new(sim), ArrayLengths::default()),
            probe,
        )
    }

    #[test]
    fn test_scalar_fields_skip_type_lookup() {
        let (s, probe) = session();
        let bus = s.find_bus_no(1).unwrap();
        let (mut name, mut kv, mut number) = (String::new(), 0.0, 0);
        s.get_data(bus, &[BUS_S_NAME, BUS_D_KV_NOMINAL, BUS_N_NUMBER])
            .scan(&mut [&mut name, &mut kv, &mut number])
            .unwrap();
        assert_eq!((name.as_str(), kv, number), ("NEVADA", 132.0, 1));
        assert_eq!(probe.count(Procedure::EquipmentType), 0);
        assert_eq!(probe.count(Procedure::GetData), 3);
    }

    #[test]
    fn test_array_field_sized_from_schema() {
        let (s, probe) = session();
        let line = s.next_equipment(EquipmentType::LINE).next().unwrap();
        let mut ratings: Vec<f64> = Vec::new();
        let mut id = String::new();
        s.get_data(line, &[LN_V_D_RATING, LN_S_ID, LN_V_D_RATING])
            .scan(&mut [&mut ratings, &mut id, &mut Vec::<f64>::new()])
            .unwrap();
        assert_eq!(ratings, vec![600.0, 800.0, 1000.0, 1200.0]);
        assert_eq!(id, "1");
        // Looked up once for both array tokens.
        assert_eq!(probe.count(Procedure::EquipmentType), 1);
    }

    #[test]
    fn test_missing_array_length_is_schema_error() {
        let sim = SimulatedEngine::sample();
        let s = Session::with_engine(Box::new(sim), ArrayLengths::empty());
        let line = s.next_equipment(EquipmentType::LINE).next().unwrap();
        let row = s.get_data(line, &[LN_S_ID, LN_V_D_RATING]);
        assert_eq!(row.get(0), Some(&FieldValue::Text("1".into())));
        assert_eq!(
            row.error(),
            Some(&BridgeError::Schema {
                equipment: EquipmentType::LINE,
                token: LN_V_D_RATING
            })
        );
    }

    #[test]
    fn test_token_errors_accumulate() {
        let (s, _) = session();
        let bus = s.find_bus_no(2).unwrap();
        let row = s.get_data(bus, &[Token(42), BUS_S_NAME, LN_S_ID]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.error(), Some(&BridgeError::UnknownToken(Token(42))));
        assert_eq!(row.get(1), Some(&FieldValue::Text("OHIO".into())));
        assert_eq!(row.get(2), None);
        let mut name = String::new();
        assert!(row.scan(&mut [&mut String::new(), &mut name, &mut String::new()]).is_err());
        assert!(name.is_empty());
    }

    #[test]
    fn test_set_data_requires_matching_kind() {
        let (s, probe) = session();
        let bus = s.find_bus_no(2).unwrap();
        let err = s.set_data(bus, BUS_D_KV_NOMINAL, 138).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
        let err = s.set_data(bus, Token(42), 1).unwrap_err();
        assert_eq!(err, BridgeError::UnknownToken(Token(42)));
        assert_eq!(probe.count(Procedure::SetDataEx), 0);
    }

    #[test]
    fn test_staged_write_visible_after_post() {
        let (s, _) = session();
        let bus = s.find_bus_no(2).unwrap();
        s.set_data(bus, BUS_S_NAME, "TEXAS").unwrap();
        s.set_data(bus, BUS_D_KV_NOMINAL, 138.0).unwrap();

        let mut name = String::new();
        s.get_data(bus, &[BUS_S_NAME]).scan(&mut [&mut name]).unwrap();
        assert_eq!(name, "OHIO");

        s.post_data(bus).unwrap();
        let mut kv = 0.0;
        s.get_data(bus, &[BUS_S_NAME, BUS_D_KV_NOMINAL])
            .scan(&mut [&mut name, &mut kv])
            .unwrap();
        assert_eq!((name.as_str(), kv), ("TEXAS", 138.0));
    }

    #[test]
    fn test_rejected_post_discards_staged_writes() {
        let (s, _) = session();
        let bus = s.find_bus_no(2).unwrap();
        s.set_data(bus, BUS_D_KV_NOMINAL, -1.0).unwrap();
        assert!(s.post_data(bus).unwrap_err().is_native());
        s.post_data(bus).unwrap();
        let mut kv = 0.0;
        s.get_data(bus, &[BUS_D_KV_NOMINAL]).scan(&mut [&mut kv]).unwrap();
        assert_eq!(kv, 132.0);
    }
}
