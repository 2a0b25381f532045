use tracing::trace;

use crate::registers::{self, Profile};
use crate::status::{DeviceStatus, MIN_TABLE_WORDS};

/// Second word of a WRITE_DATA response when the device applied the write.
const ACK_CODE: u16 = 245;

pub const DEFAULT_BOOST_MINUTES: u16 = 30;
pub const DEFAULT_FIREPLACE_MINUTES: u16 = 15;

/// The transaction kinds of the web UI protocol.
///
/// The mode word determines both the request layout and how the response
/// bytes must be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DataMode {
    /// Request a raw log dump. Not decoded by this driver.
    LogRaw = 243,
    /// Request the full status table.
    ReadTables = 246,
    /// Read back individual registers.
    ReadData = 247,
    /// Write one or more registers.
    WriteData = 249,
}

impl DataMode {
    pub const fn word(self) -> u16 {
        self as u16
    }
}

/// Errors detected before any encoding or I/O takes place.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("the {0} profile has no dedicated fan speed register")]
    FanSpeedProfile(Profile),
    #[error("the {0} profile has no dedicated target temperature register")]
    TargetTemperatureProfile(Profile),
    #[error("fan speed of {0}% is outside of the 0..=100 range")]
    FanSpeedRange(u8),
    #[error("target temperature of {0}°C is outside of the 5..=25 range")]
    TargetTemperatureRange(u8),
}

/// Errors raised while validating or decoding a response frame.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("response corrupted, length: {0} bytes")]
    Corrupted(usize),
    #[error("response corrupted, data length or checksum does not match")]
    ChecksumMismatch,
    #[error("device did not acknowledge the write")]
    WriteRejected,
    #[error("status table incomplete, {0} words received")]
    IncompleteTable(usize),
    #[error("decoding of {0} responses is not implemented")]
    NotImplemented(DataMode),
}

/// Durations and flags that later profile switches depend on.
///
/// A switch into the boost or fireplace profile must send the period duration
/// along, so the most recently set or observed values are remembered here.
/// Zero stands for "never observed"; the accessors substitute the defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimerMemory {
    boost_minutes: u16,
    fireplace_minutes: u16,
    boost_timer_enabled: bool,
    fireplace_timer_enabled: bool,
}

impl TimerMemory {
    pub fn boost_minutes(&self) -> u16 {
        if self.boost_minutes > 0 { self.boost_minutes } else { DEFAULT_BOOST_MINUTES }
    }

    pub fn fireplace_minutes(&self) -> u16 {
        if self.fireplace_minutes > 0 {
            self.fireplace_minutes
        } else {
            DEFAULT_FIREPLACE_MINUTES
        }
    }

    pub fn boost_timer_enabled(&self) -> bool {
        self.boost_timer_enabled
    }

    pub fn fireplace_timer_enabled(&self) -> bool {
        self.fireplace_timer_enabled
    }

    fn observe(&mut self, status: &DeviceStatus) {
        self.boost_minutes = status.boost_time;
        self.fireplace_minutes = status.fireplace_time;
        self.boost_timer_enabled = status.boost_timer_enabled;
        self.fireplace_timer_enabled = status.fireplace_timer_enabled;
    }
}

/// A successfully validated response frame.
#[derive(Debug, PartialEq)]
pub enum Response {
    /// The checksum held up and, for writes, the device acknowledged.
    Ack,
    /// A decoded status table.
    Status(Box<DeviceStatus>),
}

/// The fixed READ_TABLES request: parameter count 3, mode word 246, one zero
/// data word, checksum 249.
pub const READ_TABLES_REQUEST: [u8; 8] = [0x03, 0x00, 0xF6, 0x00, 0x00, 0x00, 0xF9, 0x00];

/// Builds a WRITE_DATA frame for one or more (address, value) pairs.
///
/// Layout is `[count][mode]{[address][value]}*[checksum]`, every field a
/// little-endian 16-bit word. The count covers the mode and checksum slots in
/// addition to the pairs, and the checksum is the wrapping 16-bit sum of every
/// preceding word. This arithmetic is the wire contract with the unit and must
/// not change.
pub fn write_request(pairs: &[(u16, u16)]) -> Vec<u8> {
    let parameter_count = pairs.len() as u16 * 2 + 2;
    let mut frame = Vec::with_capacity((usize::from(parameter_count) + 1) * 2);
    frame.extend(parameter_count.to_le_bytes());
    frame.extend(DataMode::WriteData.word().to_le_bytes());
    let mut checksum = parameter_count.wrapping_add(DataMode::WriteData.word());
    for &(address, value) in pairs {
        frame.extend(address.to_le_bytes());
        frame.extend(value.to_le_bytes());
        checksum = checksum.wrapping_add(address).wrapping_add(value);
    }
    frame.extend(checksum.to_le_bytes());
    trace!(message = "encoded write request", frame = ?frame);
    frame
}

pub fn power_request(on: bool) -> Vec<u8> {
    write_request(&[(registers::UNIT_POWER, u16::from(on))])
}

/// Switching away from boost/fireplace clears both countdowns; switching into
/// one of them starts the countdown from the remembered (or default) duration.
pub fn switch_profile_request(profile: Profile, timers: &TimerMemory) -> Vec<u8> {
    match profile {
        Profile::AtHome => write_request(&[
            (registers::PROFILE_AWAY, 0),
            (registers::BOOST_TIMER, 0),
            (registers::FIREPLACE_TIMER, 0),
        ]),
        Profile::Away => write_request(&[
            (registers::PROFILE_AWAY, 1),
            (registers::BOOST_TIMER, 0),
            (registers::FIREPLACE_TIMER, 0),
        ]),
        Profile::Boost => write_request(&[
            (registers::BOOST_TIMER, timers.boost_minutes()),
            (registers::FIREPLACE_TIMER, 0),
        ]),
        Profile::Fireplace => write_request(&[
            (registers::BOOST_TIMER, 0),
            (registers::FIREPLACE_TIMER, timers.fireplace_minutes()),
        ]),
    }
}

fn fan_percent(value: u8) -> Result<u16, RequestError> {
    if value > 100 {
        return Err(RequestError::FanSpeedRange(value));
    }
    Ok(u16::from(value))
}

pub fn fan_speed_request(profile: Profile, percent: u8) -> Result<Vec<u8>, RequestError> {
    let value = fan_percent(percent)?;
    let address = match profile {
        Profile::AtHome => registers::HOME_FAN_SPEED,
        Profile::Away => registers::AWAY_FAN_SPEED,
        Profile::Boost => registers::BOOST_FAN_SPEED,
        Profile::Fireplace => return Err(RequestError::FanSpeedProfile(profile)),
    };
    Ok(write_request(&[(address, value)]))
}

pub fn extract_fan_balance_request(percent: u8) -> Result<Vec<u8>, RequestError> {
    Ok(write_request(&[(registers::EXTRACT_FAN_BALANCE_BASE, fan_percent(percent)?)]))
}

pub fn supply_fan_balance_request(percent: u8) -> Result<Vec<u8>, RequestError> {
    Ok(write_request(&[(registers::SUPPLY_FAN_BALANCE_BASE, fan_percent(percent)?)]))
}

pub fn fireplace_extract_fan_request(percent: u8) -> Result<Vec<u8>, RequestError> {
    Ok(write_request(&[(registers::FIREPLACE_EXTRACT_FAN, fan_percent(percent)?)]))
}

pub fn fireplace_supply_fan_request(percent: u8) -> Result<Vec<u8>, RequestError> {
    Ok(write_request(&[(registers::FIREPLACE_SUPPLY_FAN, fan_percent(percent)?)]))
}

pub fn target_temperature_request(profile: Profile, celsius: u8) -> Result<Vec<u8>, RequestError> {
    if !(5..=25).contains(&celsius) {
        return Err(RequestError::TargetTemperatureRange(celsius));
    }
    let address = match profile {
        Profile::AtHome => registers::HOME_TARGET_TEMPERATURE,
        Profile::Away => registers::AWAY_TARGET_TEMPERATURE,
        Profile::Boost => registers::BOOST_TARGET_TEMPERATURE,
        Profile::Fireplace => return Err(RequestError::TargetTemperatureProfile(profile)),
    };
    Ok(write_request(&[(address, u16::from(celsius))]))
}

pub fn boost_time_request(minutes: u16, timers: &mut TimerMemory) -> Vec<u8> {
    timers.boost_minutes = minutes;
    write_request(&[(registers::BOOST_TIME, minutes)])
}

pub fn boost_timer_enabled_request(enabled: bool, timers: &mut TimerMemory) -> Vec<u8> {
    timers.boost_timer_enabled = enabled;
    write_request(&[(registers::BOOST_TIMER_ENABLED, u16::from(enabled))])
}

pub fn fireplace_time_request(minutes: u16, timers: &mut TimerMemory) -> Vec<u8> {
    timers.fireplace_minutes = minutes;
    write_request(&[(registers::FIREPLACE_TIME, minutes)])
}

pub fn fireplace_timer_enabled_request(enabled: bool, timers: &mut TimerMemory) -> Vec<u8> {
    timers.fireplace_timer_enabled = enabled;
    write_request(&[(registers::FIREPLACE_TIMER_ENABLED, u16::from(enabled))])
}

pub fn weekly_timer_enabled_request(enabled: bool) -> Vec<u8> {
    write_request(&[(registers::WEEKLY_TIMER_ENABLED, u16::from(enabled))])
}

/// Validates and decodes one response frame.
///
/// Request/acknowledgement frames carry little-endian words while the status
/// table is big-endian. That asymmetry is how the device behaves.
pub fn decode_response(
    mode: DataMode,
    bytes: &[u8],
    timers: &mut TimerMemory,
) -> Result<Response, ProtocolError> {
    trace!(message = "decoding response", ?mode, length = bytes.len());
    if bytes.len() <= 5 || bytes.len() % 2 != 0 {
        return Err(ProtocolError::Corrupted(bytes.len()));
    }
    match mode {
        DataMode::WriteData | DataMode::ReadData => {
            let words: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            let computed =
                words[..words.len() - 1].iter().fold(0u16, |sum, word| sum.wrapping_add(*word));
            if usize::from(words[0]) != words.len() - 1 || words[words.len() - 1] != computed {
                return Err(ProtocolError::ChecksumMismatch);
            }
            if mode == DataMode::WriteData && words[1] != ACK_CODE {
                return Err(ProtocolError::WriteRejected);
            }
            Ok(Response::Ack)
        }
        DataMode::ReadTables => {
            let words = bytes.len() / 2;
            if words < MIN_TABLE_WORDS {
                return Err(ProtocolError::IncompleteTable(words));
            }
            let status = DeviceStatus::from_table(bytes);
            timers.observe(&status);
            Ok(Response::Status(Box::new(status)))
        }
        DataMode::LogRaw => Err(ProtocolError::NotImplemented(mode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::tests::captured_table;

    /// The reference frames were recorded as signed bytes.
    fn frame(signed: &[i8]) -> Vec<u8> {
        signed.iter().map(|b| *b as u8).collect()
    }

    #[test]
    fn read_tables_request_is_the_fixed_frame() {
        assert_eq!(READ_TABLES_REQUEST.to_vec(), frame(&[3, 0, -10, 0, 0, 0, -7, 0]));
    }

    #[test]
    fn switch_profile_frames() {
        let timers = TimerMemory::default();
        assert_eq!(
            switch_profile_request(Profile::AtHome, &timers),
            frame(&[8, 0, -7, 0, 1, 18, 0, 0, 4, 18, 0, 0, 5, 18, 0, 0, 11, 55]),
        );
        assert_eq!(
            switch_profile_request(Profile::Away, &timers),
            frame(&[8, 0, -7, 0, 1, 18, 1, 0, 4, 18, 0, 0, 5, 18, 0, 0, 12, 55]),
        );
        // No duration has ever been observed, so the defaults go out.
        assert_eq!(
            switch_profile_request(Profile::Boost, &timers),
            frame(&[6, 0, -7, 0, 4, 18, 30, 0, 5, 18, 0, 0, 38, 37]),
        );
        assert_eq!(
            switch_profile_request(Profile::Fireplace, &timers),
            frame(&[6, 0, -7, 0, 4, 18, 0, 0, 5, 18, 15, 0, 23, 37]),
        );
    }

    #[test]
    fn switch_profile_reuses_set_durations() {
        let mut timers = TimerMemory::default();
        boost_time_request(60, &mut timers);
        fireplace_time_request(60, &mut timers);
        assert_eq!(
            switch_profile_request(Profile::Boost, &timers),
            frame(&[6, 0, -7, 0, 4, 18, 60, 0, 5, 18, 0, 0, 68, 37]),
        );
        assert_eq!(
            switch_profile_request(Profile::Fireplace, &timers),
            frame(&[6, 0, -7, 0, 4, 18, 0, 0, 5, 18, 60, 0, 68, 37]),
        );
    }

    #[test]
    fn power_frames() {
        assert_eq!(power_request(false), frame(&[4, 0, -7, 0, 2, 18, 0, 0, -1, 18]));
        assert_eq!(power_request(true), frame(&[4, 0, -7, 0, 2, 18, 1, 0, 0, 19]));
    }

    #[test]
    fn fan_speed_frames() {
        let speed = |profile, pct| fan_speed_request(profile, pct).unwrap();
        assert_eq!(speed(Profile::AtHome, 0), frame(&[4, 0, -7, 0, 27, 80, 0, 0, 24, 81]));
        assert_eq!(speed(Profile::AtHome, 50), frame(&[4, 0, -7, 0, 27, 80, 50, 0, 74, 81]));
        assert_eq!(speed(Profile::AtHome, 100), frame(&[4, 0, -7, 0, 27, 80, 100, 0, 124, 81]));
        assert_eq!(speed(Profile::Away, 50), frame(&[4, 0, -7, 0, 21, 80, 50, 0, 68, 81]));
        assert_eq!(speed(Profile::Boost, 100), frame(&[4, 0, -7, 0, 33, 80, 100, 0, -126, 81]));
    }

    #[test]
    fn fan_balance_and_fireplace_fan_frames() {
        assert_eq!(
            extract_fan_balance_request(50).unwrap(),
            frame(&[4, 0, -7, 0, 5, 80, 50, 0, 52, 81]),
        );
        assert_eq!(
            supply_fan_balance_request(100).unwrap(),
            frame(&[4, 0, -7, 0, 6, 80, 100, 0, 103, 81]),
        );
        assert_eq!(
            fireplace_extract_fan_request(0).unwrap(),
            frame(&[4, 0, -7, 0, 7, 80, 0, 0, 4, 81]),
        );
        assert_eq!(
            fireplace_supply_fan_request(50).unwrap(),
            frame(&[4, 0, -7, 0, 8, 80, 50, 0, 55, 81]),
        );
    }

    #[test]
    fn target_temperature_frames() {
        let target = |profile, deg| target_temperature_request(profile, deg).unwrap();
        assert_eq!(target(Profile::AtHome, 5), frame(&[4, 0, -7, 0, 28, 80, 5, 0, 30, 81]));
        assert_eq!(target(Profile::AtHome, 25), frame(&[4, 0, -7, 0, 28, 80, 25, 0, 50, 81]));
        assert_eq!(target(Profile::Away, 25), frame(&[4, 0, -7, 0, 22, 80, 25, 0, 44, 81]));
        assert_eq!(target(Profile::Boost, 5), frame(&[4, 0, -7, 0, 34, 80, 5, 0, 36, 81]));
    }

    #[test]
    fn timer_frames() {
        let mut timers = TimerMemory::default();
        assert_eq!(
            boost_time_request(15, &mut timers),
            frame(&[4, 0, -7, 0, 64, 80, 15, 0, 76, 81]),
        );
        assert_eq!(
            fireplace_time_request(15, &mut timers),
            frame(&[4, 0, -7, 0, 65, 80, 15, 0, 77, 81]),
        );
        assert_eq!(
            boost_timer_enabled_request(true, &mut timers),
            frame(&[4, 0, -7, 0, 6, 85, 1, 0, 4, 86]),
        );
        assert_eq!(
            fireplace_timer_enabled_request(false, &mut timers),
            frame(&[4, 0, -7, 0, 7, 85, 0, 0, 4, 86]),
        );
        assert_eq!(weekly_timer_enabled_request(true), frame(&[4, 0, -7, 0, 7, 18, 1, 0, 5, 19]));
        assert!(timers.boost_timer_enabled());
        assert!(!timers.fireplace_timer_enabled());
    }

    #[test]
    fn fireplace_profile_has_no_speed_or_temperature_registers() {
        assert_eq!(
            fan_speed_request(Profile::Fireplace, 50),
            Err(RequestError::FanSpeedProfile(Profile::Fireplace)),
        );
        assert_eq!(
            target_temperature_request(Profile::Fireplace, 20),
            Err(RequestError::TargetTemperatureProfile(Profile::Fireplace)),
        );
    }

    #[test]
    fn out_of_range_values_are_rejected_before_encoding() {
        assert_eq!(fan_speed_request(Profile::AtHome, 101), Err(RequestError::FanSpeedRange(101)));
        assert_eq!(extract_fan_balance_request(255), Err(RequestError::FanSpeedRange(255)));
        assert_eq!(
            target_temperature_request(Profile::Away, 4),
            Err(RequestError::TargetTemperatureRange(4)),
        );
        assert_eq!(
            target_temperature_request(Profile::Away, 26),
            Err(RequestError::TargetTemperatureRange(26)),
        );
    }

    #[test]
    fn write_acknowledgement_decoding() {
        let mut timers = TimerMemory::default();
        let ack = [2, 0, 245, 0, 247, 0];
        assert!(matches!(
            decode_response(DataMode::WriteData, &ack, &mut timers),
            Ok(Response::Ack)
        ));

        let mut bad_checksum = ack;
        bad_checksum[4] = 0;
        assert_eq!(
            decode_response(DataMode::WriteData, &bad_checksum, &mut timers),
            Err(ProtocolError::ChecksumMismatch),
        );

        // Valid checksum but no acknowledgement code.
        let rejected = [2, 0, 0, 0, 2, 0];
        assert_eq!(
            decode_response(DataMode::WriteData, &rejected, &mut timers),
            Err(ProtocolError::WriteRejected),
        );

        // READ_DATA responses only need the checksum to hold up.
        let read_back = [2, 0, 99, 0, 101, 0];
        assert!(matches!(
            decode_response(DataMode::ReadData, &read_back, &mut timers),
            Ok(Response::Ack)
        ));
    }

    #[test]
    fn request_frames_are_not_acknowledgements() {
        // A write request has the same count/checksum shape as an
        // acknowledgement, but its second word is the mode, not the ack code.
        let mut timers = TimerMemory::default();
        assert_eq!(
            decode_response(DataMode::WriteData, &power_request(true), &mut timers),
            Err(ProtocolError::WriteRejected),
        );
    }

    #[test]
    fn structural_checks_come_first() {
        let mut timers = TimerMemory::default();
        assert_eq!(
            decode_response(DataMode::WriteData, &[2, 0, 245, 0], &mut timers),
            Err(ProtocolError::Corrupted(4)),
        );
        assert_eq!(
            decode_response(DataMode::ReadTables, &[0; 7], &mut timers),
            Err(ProtocolError::Corrupted(7)),
        );
        assert_eq!(
            decode_response(DataMode::ReadTables, &[0; 1408], &mut timers),
            Err(ProtocolError::IncompleteTable(704)),
        );
    }

    #[test]
    fn status_decoding_updates_the_timer_memory() {
        let mut timers = TimerMemory::default();
        let decoded =
            decode_response(DataMode::ReadTables, &captured_table(), &mut timers).unwrap();
        let Response::Status(status) = decoded else {
            panic!("expected a status response");
        };
        assert_eq!(status.fan_speed_percentage, 50);
        assert_eq!(status.temp_inside, 22.87);
        assert_eq!(timers.boost_minutes(), 30);
        assert_eq!(timers.fireplace_minutes(), 240);
        assert!(timers.boost_timer_enabled());
        assert!(timers.fireplace_timer_enabled());
    }

    #[test]
    fn log_responses_are_not_implemented() {
        let mut timers = TimerMemory::default();
        assert_eq!(
            decode_response(DataMode::LogRaw, &[0; 6], &mut timers),
            Err(ProtocolError::NotImplemented(DataMode::LogRaw)),
        );
    }
}
