//! Decodes the byte stream the vibrotactile device receives, turning it back
//! into [`DeviceCommand`]s. The host never needs this to drive the device;
//! it exists so the wire protocol can be checked from the other end of the
//! cable (see the `monitor` binary) and in tests.

use crate::telemetry::{DeviceMode, TelemetryFrame};

use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, one_of},
    combinator::{map, map_res},
    sequence::{delimited, separated_pair},
    IResult,
};

/// One message as the device sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// A `{fff;bbb}` frame setting both motor intensities.
    Intensity(TelemetryFrame),
    /// A single `F` or `I` byte switching the device mode.
    Mode(DeviceMode),
}

fn parse_channel(s: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), |digits: &str| {
        digits.parse::<u8>()
    })(s)
}

fn parse_frame(s: &str) -> IResult<&str, TelemetryFrame> {
    map(
        delimited(
            char('{'),
            separated_pair(parse_channel, char(';'), parse_channel),
            char('}'),
        ),
        |(front, back)| TelemetryFrame::new(front, back),
    )(s)
}

fn parse_mode(s: &str) -> IResult<&str, DeviceMode> {
    map(one_of("FI"), |c| match c {
        'F' => DeviceMode::Frequency,
        _ => DeviceMode::Intensity,
    })(s)
}

/// Parse exactly one command from the start of `s`.
pub fn parse_command(s: &str) -> IResult<&str, DeviceCommand> {
    alt((
        map(parse_frame, DeviceCommand::Intensity),
        map(parse_mode, DeviceCommand::Mode),
    ))(s)
}

/// Decode as many commands from `s` as possible.
///
/// Bytes that cannot start a command are skipped, and reported as the
/// second element of the result. Whatever might still be the beginning of a
/// command that has not fully arrived is returned as the tail, so it can be
/// prepended to the next read.
pub fn decode_stream(s: &str) -> (Vec<DeviceCommand>, Vec<char>, &str) {
    let mut commands = Vec::new();
    let mut skipped = Vec::new();
    let mut rest = s;

    while let Some(first) = rest.chars().next() {
        match parse_command(rest) {
            Ok((remaining, command)) => {
                commands.push(command);
                rest = remaining;
            }
            Err(_) if first == '{' && could_be_partial_frame(rest) => break,
            Err(_) => {
                skipped.push(first);
                rest = &rest[first.len_utf8()..];
            }
        }
    }

    (commands, skipped, rest)
}

fn could_be_partial_frame(s: &str) -> bool {
    // "{", "{1", ... up to "{123;45" with no closing brace yet
    s.len() < 9
        && s.chars().enumerate().skip(1).all(|(i, c)| match i {
            4 => c == ';',
            _ => c.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame() {
        let (leftover, res) = parse_command("{255;000}").unwrap();
        assert_eq!(leftover, "");
        assert_eq!(res, DeviceCommand::Intensity(TelemetryFrame::new(255, 0)));
    }

    #[test]
    fn parses_modes() {
        assert_eq!(
            parse_command("F").unwrap().1,
            DeviceCommand::Mode(DeviceMode::Frequency)
        );
        assert_eq!(
            parse_command("I").unwrap().1,
            DeviceCommand::Mode(DeviceMode::Intensity)
        );
    }

    #[test]
    fn rejects_out_of_range_channel() {
        assert!(parse_command("{256;000}").is_err());
    }

    #[test]
    fn rejects_short_channel() {
        assert!(parse_command("{25;000}").is_err());
    }

    #[test]
    fn decodes_a_mixed_stream() {
        let (commands, skipped, rest) = decode_stream("{128;128}F{000;255}I{000;000}");
        assert!(skipped.is_empty());
        assert_eq!(rest, "");
        assert_eq!(
            commands,
            vec![
                DeviceCommand::Intensity(TelemetryFrame::new(128, 128)),
                DeviceCommand::Mode(DeviceMode::Frequency),
                DeviceCommand::Intensity(TelemetryFrame::new(0, 255)),
                DeviceCommand::Mode(DeviceMode::Intensity),
                DeviceCommand::Intensity(TelemetryFrame::REST),
            ]
        );
    }

    #[test]
    fn keeps_partial_tail() {
        let (commands, skipped, rest) = decode_stream("{001;002}{12");
        assert_eq!(commands.len(), 1);
        assert!(skipped.is_empty());
        assert_eq!(rest, "{12");

        let joined = format!("{}3;004}}", rest);
        let (commands, _, rest) = decode_stream(&joined);
        assert_eq!(
            commands,
            vec![DeviceCommand::Intensity(TelemetryFrame::new(123, 4))]
        );
        assert_eq!(rest, "");
    }

    #[test]
    fn skips_garbage() {
        let (commands, skipped, rest) = decode_stream("xx{9x9;000}F");
        assert_eq!(commands, vec![DeviceCommand::Mode(DeviceMode::Frequency)]);
        assert_eq!(rest, "");
        assert!(!skipped.is_empty());
    }
}
