use super::Session;
use crate::codec;
use crate::cursor::{step_handle, HandleCursor};
use crate::data::Handle;
use crate::error::{BridgeError, Result};
use crate::fault::{RelayOperation, RelayTimeInputs};
use crate::native::{Arg, Procedure};
use crate::phasor::Phasor;

impl Session {
    /// Relays in a relay group.
    pub fn next_relay(&self, group: Handle) -> HandleCursor {
        self.group_cursor(Procedure::GetRelay, group)
    }

    /// Logic schemes in a relay group.
    pub fn next_logic_scheme(&self, group: Handle) -> HandleCursor {
        self.group_cursor(Procedure::GetLogicScheme, group)
    }

    fn group_cursor(&self, procedure: Procedure, group: Handle) -> HandleCursor {
        let session = self.clone();
        HandleCursor::new(move |prev| {
            step_handle(procedure.name(), prev, |hnd| {
                session
                    .gate
                    .invoke(procedure, &mut [Arg::Int(group.raw()), Arg::Out(hnd)])
            })
        })
    }

    /// Operating time of `relay` for the picked fault, with the relay's
    /// current scaled by `mult`.
    pub fn relay_time(&self, relay: Handle, mult: f64, trip_only: bool) -> Result<RelayOperation> {
        if mult.is_nan() || mult <= 0.0 {
            return Err(BridgeError::invalid(
                Procedure::GetRelayTime.name(),
                format!("current multiplier must be positive, got {mult}"),
            ));
        }
        let mut time = [0u8; codec::DOUBLE_SIZE];
        let mut text = vec![0u8; codec::RELAY_TEXT_LEN];
        let [mult_lo, mult_hi] = Arg::double(mult);
        self.status(
            Procedure::GetRelayTime,
            &mut [
                Arg::Int(relay.raw()),
                mult_lo,
                mult_hi,
                Arg::Out(&mut time),
                Arg::Out(&mut text),
                Arg::flag(trip_only),
            ],
        )?;
        Ok(RelayOperation {
            time: codec::decode_f64(&time),
            text: codec::decode_str(&text),
        })
    }

    /// Operating time of a relay for caller-supplied currents and voltages,
    /// independent of any fault run.
    pub fn compute_relay_time(&self, handle: Handle, inputs: &RelayTimeInputs) -> Result<RelayOperation> {
        let (current_mag, current_ang) = polar_blocks(&inputs.currents());
        let (voltage_mag, voltage_ang) = polar_blocks(&inputs.voltages());
        let [vpre_mag_lo, vpre_mag_hi] = Arg::double(inputs.vpre.mag());
        let [vpre_ang_lo, vpre_ang_hi] = Arg::double(inputs.vpre.ang());
        let mut time = [0u8; codec::DOUBLE_SIZE];
        let mut text = vec![0u8; codec::RELAY_TEXT_LEN];
        self.status(
            Procedure::ComputeRelayTime,
            &mut [
                Arg::Int(handle.raw()),
                Arg::In(&current_mag),
                Arg::In(&current_ang),
                Arg::In(&voltage_mag),
                Arg::In(&voltage_ang),
                vpre_mag_lo,
                vpre_mag_hi,
                vpre_ang_lo,
                vpre_ang_hi,
                Arg::Out(&mut time),
                Arg::Out(&mut text),
            ],
        )?;
        Ok(RelayOperation {
            time: codec::decode_f64(&time),
            text: codec::decode_str(&text),
        })
    }
}

/// Magnitude and angle blocks of `phasors`, in that order.
fn polar_blocks(phasors: &[Phasor]) -> (Vec<u8>, Vec<u8>) {
    let mags: Vec<f64> = phasors.iter().map(|p| p.mag()).collect();
    let angs: Vec<f64> = phasors.iter().map(|p| p.ang()).collect();
    (codec::encode_f64_array(&mags), codec::encode_f64_array(&angs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polar_blocks() {
        let (mags, angs) = polar_blocks(&[Phasor::new(2.0, 30.0), Phasor::default()]);
        let mags = codec::decode_f64_array(&mags);
        assert!((mags[0] - 2.0).abs() < 1e-12);
        assert_eq!(mags[1], 0.0);
        let angs = codec::decode_f64_array(&angs);
        assert!((angs[0] - 30.0).abs() < 1e-9);
        assert_eq!(angs[1], 0.0);
    }
}
