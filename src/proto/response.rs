use super::{ProtoError, Result};

/// One line of device output, stripped of the terminator and trailing
/// whitespace. May be empty if the device sent a bare terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(String);

impl Reply {
    pub(crate) fn from_line(line: &str) -> Self {
        Self(line.trim_end().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parses a measurement reply. `VOUT1?` and `IOUT1?` are answered with
    /// a bare decimal like `5.02`. An empty line or a non-numeric payload
    /// is an error, never a zero reading.
    pub fn parse_measurement(&self) -> Result<f64> {
        self.0
            .trim()
            .parse::<f64>()
            .map_err(|_| ProtoError::Malformed(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_measurements() {
        assert_eq!(
            Reply::from_line("5.123").parse_measurement().expect("volts"),
            5.123
        );
        assert_eq!(
            Reply::from_line("0.000").parse_measurement().expect("amps"),
            0.0
        );
    }

    #[test]
    fn rejects_empty_reply() {
        let err = Reply::from_line("").parse_measurement().unwrap_err();
        assert!(matches!(err, ProtoError::Malformed(_)));
    }

    #[test]
    fn rejects_non_numeric_reply() {
        let err = Reply::from_line("abc").parse_measurement().unwrap_err();
        assert!(matches!(err, ProtoError::Malformed(text) if text == "abc"));
    }

    #[test]
    fn from_line_strips_trailing_whitespace() {
        assert_eq!(Reply::from_line("KORAD KA3005P V5.8\r").as_str(), "KORAD KA3005P V5.8");
    }
}
