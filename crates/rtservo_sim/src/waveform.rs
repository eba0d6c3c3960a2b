//! Waveform recording for testbench runs.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes the IEEE 1364 Value Change Dump (VCD) text format, viewable in
//! GTKWave, Surfer or any other waveform viewer.

use std::io::Write;

use rtservo_common::mask;

use crate::error::SimError;
use crate::time::SimTime;

/// Identifies one traced signal within a recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(u32);

impl TraceId {
    /// Creates an ID from a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Records signal changes from a run.
pub trait WaveformRecorder {
    /// Registers a signal of `width` bits under `id`.
    fn register_signal(&mut self, id: TraceId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level).
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records the value of a signal at `time`. Values equal to the last
    /// recorded one may be dropped.
    fn record(&mut self, time: SimTime, id: TraceId, value: u64) -> Result<(), SimError>;

    /// Flushes the output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

struct VcdSignal {
    id: TraceId,
    code: String,
    width: u32,
    last: Option<u64>,
}

/// VCD writer with a 1 fs timescale. Only value changes are emitted.
pub struct VcdRecorder<W: Write> {
    writer: W,
    signals: Vec<VcdSignal>,
    header_written: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            signals: Vec::new(),
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  rtservo {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    /// Printable identifier code for the `index`th signal, starting at `!`.
    fn make_id_code(index: u32) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn format_value(value: u64, width: u32) -> String {
        if width == 1 {
            return if value & 1 == 1 { "1" } else { "0" }.to_string();
        }
        format!("b{:b}", value & mask(width))
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: TraceId, name: &str, width: u32) -> Result<(), SimError> {
        if self.current_time.is_some() {
            return Err(SimError::InvalidSignalRef {
                reason: format!("signal '{name}' registered after the first value change"),
            });
        }
        if width == 0 {
            return Err(SimError::InvalidSignalRef {
                reason: format!("signal '{name}' has zero width"),
            });
        }
        self.write_header()?;
        let code = Self::make_id_code(self.signals.len() as u32);
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.signals.push(VcdSignal {
            id,
            code,
            width,
            last: None,
        });
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record(&mut self, time: SimTime, id: TraceId, value: u64) -> Result<(), SimError> {
        let index = self
            .signals
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SimError::InvalidSignalRef {
                reason: format!("unregistered VCD signal {}", id.as_raw()),
            })?;
        let value = value & mask(self.signals[index].width);
        if self.signals[index].last == Some(value) {
            return Ok(());
        }

        if self.current_time != Some(time.fs) {
            if self.current_time.is_none() {
                self.write_header()?;
                writeln!(self.writer, "$enddefinitions $end")?;
            }
            writeln!(self.writer, "#{}", time.fs)?;
            self.current_time = Some(time.fs);
        }

        let signal = &mut self.signals[index];
        signal.last = Some(value);
        let text = Self::format_value(value, signal.width);
        if signal.width == 1 {
            writeln!(self.writer, "{text}{}", signal.code)?;
        } else {
            writeln!(self.writer, "{text} {}", signal.code)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.write_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
            // later finalize calls must not repeat the terminator
            self.current_time = Some(0);
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(rec: &VcdRecorder<Vec<u8>>) -> String {
        String::from_utf8(rec.writer.clone()).unwrap()
    }

    fn recorder_with(signals: &[(&str, u32)]) -> VcdRecorder<Vec<u8>> {
        let mut rec = VcdRecorder::new(Vec::new());
        rec.begin_scope("servo").unwrap();
        for (i, (name, width)) in signals.iter().enumerate() {
            rec.register_signal(TraceId::from_raw(i as u32), name, *width)
                .unwrap();
        }
        rec.end_scope().unwrap();
        rec
    }

    #[test]
    fn id_codes() {
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(0), "!");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(93), "~");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(94).len(), 2);
    }

    #[test]
    fn header_and_vars() {
        let rec = recorder_with(&[("stb", 1), ("address", 13)]);
        let out = output(&rec);
        assert!(out.contains("$timescale"));
        assert!(out.contains("1fs"));
        assert!(out.contains("$scope module servo $end"));
        assert!(out.contains("$var wire 1 ! stb $end"));
        assert!(out.contains("$var wire 13 \" address $end"));
        assert!(out.contains("$upscope $end"));
    }

    #[test]
    fn scalar_and_vector_values() {
        let mut rec = recorder_with(&[("stb", 1), ("data", 4)]);
        rec.record(SimTime::zero(), TraceId::from_raw(0), 1).unwrap();
        rec.record(SimTime::zero(), TraceId::from_raw(1), 0b0101)
            .unwrap();
        let out = output(&rec);
        assert!(out.contains("$enddefinitions $end"));
        assert!(out.contains("#0\n1!\nb101 \"\n"));
    }

    #[test]
    fn unchanged_values_suppressed() {
        let mut rec = recorder_with(&[("busy", 1)]);
        rec.record(SimTime::from_fs(0), TraceId::from_raw(0), 0)
            .unwrap();
        rec.record(SimTime::from_fs(8), TraceId::from_raw(0), 0)
            .unwrap();
        rec.record(SimTime::from_fs(16), TraceId::from_raw(0), 1)
            .unwrap();
        let out = output(&rec);
        assert!(!out.contains("#8"));
        assert!(out.contains("#16\n1!"));
    }

    #[test]
    fn values_truncated_to_width() {
        let mut rec = recorder_with(&[("status", 2)]);
        rec.record(SimTime::zero(), TraceId::from_raw(0), 0b111)
            .unwrap();
        assert!(output(&rec).contains("b11 !"));
    }

    #[test]
    fn unregistered_signal_rejected() {
        let mut rec = recorder_with(&[("stb", 1)]);
        let err = rec
            .record(SimTime::zero(), TraceId::from_raw(7), 1)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidSignalRef { .. }));
    }

    #[test]
    fn late_registration_rejected() {
        let mut rec = recorder_with(&[("stb", 1)]);
        rec.record(SimTime::zero(), TraceId::from_raw(0), 1).unwrap();
        assert!(rec
            .register_signal(TraceId::from_raw(1), "late", 1)
            .is_err());
    }

    #[test]
    fn finalize_without_changes_closes_definitions() {
        let mut rec = recorder_with(&[("stb", 1)]);
        rec.finalize().unwrap();
        rec.finalize().unwrap();
        assert_eq!(output(&rec).matches("$enddefinitions").count(), 1);
    }
}
