use crate::channel::ChannelId;

/// Digital sample as sent by a `CURVe?` query.
///
/// With `DATA:WIDth 1` the instrument sends one byte per point. Codes are kept
/// as signed integers wide enough for both the signed (-128..=127) and the
/// unsigned (0..=255) convention and are not range checked.
pub type RawCode = i32;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Response to '{directive}' is not a number: '{response}'")]
    InvalidFloat { directive: String, response: String },

    #[error("Curve point {index} is not an integer: '{token}'")]
    InvalidCode { index: usize, token: String },

    #[error("Curve response contained no points")]
    EmptyCurve,

    #[error("Response is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Response line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("Channel {channel} returned {actual} samples, expected {expected}")]
pub struct LengthMismatch {
    pub channel: ChannelId,
    pub expected: usize,
    pub actual: usize,
}

/// Per-acquisition scaling constants of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preamble {
    /// `WFMPre:YZEro`, volts at the digital offset
    pub zero_reference: f64,
    /// `WFMPre:YMUlt`, volts per code
    pub multiplier: f64,
    /// `WFMPre:YOFf`, code of the zero reference
    pub digital_offset: f64,
}

impl Preamble {
    pub fn new(zero_reference: f64, multiplier: f64, digital_offset: f64) -> Self {
        Self {
            zero_reference,
            multiplier,
            digital_offset,
        }
    }

    pub fn code_to_voltage(&self, code: RawCode) -> f64 {
        self.zero_reference + self.multiplier * (f64::from(code) - self.digital_offset)
    }
}

/// Strip the line terminator and whitespace the instrument may pad responses with
pub(crate) fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r']).trim()
}

/// Parse the single number a preamble query answers with
pub fn parse_float(directive: &str, response: &str) -> Result<f64, DecodeError> {
    strip_terminator(response)
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidFloat {
            directive: directive.to_string(),
            response: strip_terminator(response).to_string(),
        })
}

/// Parse a `CURVe?` response line into raw codes
pub fn parse_curve(line: &str) -> Result<Vec<RawCode>, DecodeError> {
    let body = strip_terminator(line);
    if body.is_empty() {
        return Err(DecodeError::EmptyCurve);
    }

    body.split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<RawCode>().map_err(|_| DecodeError::InvalidCode {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Convert raw codes to volts, one sample per code
pub fn decode(preamble: &Preamble, codes: &[RawCode]) -> Vec<f64> {
    profile_zone!("decode");

    codes
        .iter()
        .map(|&code| preamble.code_to_voltage(code))
        .collect()
}

/// Voltage samples of every active channel, in channel-list order.
///
/// All channels hold the same number of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionResult {
    channels: Vec<(ChannelId, Vec<f64>)>,
}

impl AcquisitionResult {
    /// Assemble a result, refusing channels whose sample counts differ
    pub fn from_channels(channels: Vec<(ChannelId, Vec<f64>)>) -> Result<Self, LengthMismatch> {
        if let Some((_, first)) = channels.first() {
            let expected = first.len();
            if let Some((channel, samples)) =
                channels.iter().find(|(_, samples)| samples.len() != expected)
            {
                return Err(LengthMismatch {
                    channel: channel.clone(),
                    expected,
                    actual: samples.len(),
                });
            }
        }
        Ok(Self { channels })
    }

    pub fn get(&self, channel: &ChannelId) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, samples)| samples.as_slice())
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &[f64])> {
        self.channels
            .iter()
            .map(|(id, samples)| (id, samples.as_slice()))
    }

    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, |(_, samples)| samples.len())
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn into_inner(self) -> Vec<(ChannelId, Vec<f64>)> {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
        }
    }

    fn id(label: &str) -> ChannelId {
        ChannelId::new(label).unwrap()
    }

    #[test]
    fn test_decode_applies_preamble() {
        let preamble = Preamble::new(0.0, 0.04, 127.0);
        assert_close(&decode(&preamble, &[130, 125, 127]), &[0.12, -0.08, 0.0]);
    }

    #[test]
    fn test_decode_identity_preamble() {
        let preamble = Preamble::new(0.0, 1.0, 0.0);
        let codes = [-128, -1, 0, 1, 127, 255];
        let expected: Vec<f64> = codes.iter().map(|&c| f64::from(c)).collect();
        assert_eq!(decode(&preamble, &codes), expected);
    }

    #[test]
    fn test_decode_preserves_length() {
        let preamble = Preamble::new(0.1, 0.02, 100.0);
        for n in [0, 1, 99, 100, 10_000] {
            let codes: Vec<RawCode> = (0..n).map(|i| (i % 256) as RawCode).collect();
            assert_eq!(decode(&preamble, &codes).len(), n);
        }
    }

    #[test]
    fn test_parse_curve() {
        assert_eq!(parse_curve("127,131,123\n").unwrap(), vec![127, 131, 123]);
        assert_eq!(parse_curve("-5, 0 ,12\r\n").unwrap(), vec![-5, 0, 12]);
        assert_eq!(parse_curve("42\n").unwrap(), vec![42]);
    }

    #[test]
    fn test_parse_curve_rejects_bad_tokens() {
        let err = parse_curve("1,2,x3,4\n").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidCode { index: 2, ref token } if token == "x3"
        ));
        assert!(matches!(parse_curve("1,,2\n"), Err(DecodeError::InvalidCode { index: 1, .. })));
        assert!(matches!(parse_curve("1.5\n"), Err(DecodeError::InvalidCode { .. })));
        assert!(matches!(parse_curve("\n"), Err(DecodeError::EmptyCurve)));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("WFMPre:YMUlt?", "4.0E-2\n").unwrap(), 0.04);
        assert_eq!(parse_float("WFMPre:YOFf?", " 127\r\n").unwrap(), 127.0);
        assert!(matches!(
            parse_float("WFMPre:YZEro?", ":WFMPRE:YZERO 0.0\n"),
            Err(DecodeError::InvalidFloat { .. })
        ));
    }

    #[test]
    fn test_result_rejects_length_mismatch() {
        let result = AcquisitionResult::from_channels(vec![
            (id("1"), vec![0.0; 100]),
            (id("3"), vec![0.0; 99]),
        ]);

        let err = result.unwrap_err();
        assert_eq!(err.channel, id("3"));
        assert_eq!(err.expected, 100);
        assert_eq!(err.actual, 99);
    }

    #[test]
    fn test_result_lookup_by_channel() {
        let result = AcquisitionResult::from_channels(vec![
            (id("3"), vec![1.0, 2.0]),
            (id("1"), vec![3.0, 4.0]),
        ])
        .unwrap();

        assert_eq!(result.get(&id("1")), Some([3.0, 4.0].as_slice()));
        assert_eq!(result.get(&id("2")), None);
        assert_eq!(result.samples_per_channel(), 2);
        let order: Vec<&str> = result.channel_ids().map(ChannelId::as_str).collect();
        assert_eq!(order, vec!["3", "1"]);
    }
}
