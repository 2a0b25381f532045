use num_traits::FromPrimitive as _;

use crate::registers::{DataType, Profile, Value, centi_kelvin_to_celsius};

/// A READ_TABLES response shorter than this many 16-bit words does not carry
/// the full status table.
pub const MIN_TABLE_WORDS: usize = 705;

macro_rules! for_each_status_field {
    ($m:ident) => {
        $m! {
            128: U16, FAN_SPEED_PERCENTAGE;
            130: Celsius, TEMP_INSIDE;
            132: Celsius, TEMP_EXHAUST;
            134: Celsius, TEMP_OUTSIDE;
            136: Celsius, TEMP_INCOMING_BEFORE_HEATING;
            138: Celsius, TEMP_INCOMING;
            144: U16, FAN_SPEED_EXTRACT;
            146: U16, FAN_SPEED_SUPPLY;
            148: U16, HUMIDITY;
            150: U16, CO2;
            214: U16, PROFILE;
            220: U16, BOOST_TIMER;
            222: U16, FIREPLACE_TIMER;
            226: Bool, WEEKLY_TIMER_ENABLED;
            228: U16, CELL_STATE;
            230: U16, UPTIME_YEARS;
            232: U16, UPTIME_HOURS;
            234: U16, UPTIME_HOURS_CURRENT;
            236: U16, REMAINING_TIME_FOR_FILTER;
            374: U16, EXTRACT_FAN_BALANCE_BASE;
            376: U16, SUPPLY_FAN_BALANCE_BASE;
            378: U16, FIREPLACE_EXTRACT_FAN;
            380: U16, FIREPLACE_SUPPLY_FAN;
            406: U16, AWAY_SPEED_SETTING;
            408: Celsius, AWAY_AIR_TEMP_TARGET;
            418: U16, HOME_SPEED_SETTING;
            420: Celsius, HOME_AIR_TEMP_TARGET;
            430: U16, BOOST_SPEED_SETTING;
            432: Celsius, BOOST_AIR_TEMP_TARGET;
            492: U16, BOOST_TIME;
            494: U16, FIREPLACE_TIME;
            496: U16, FILTER_CHANGED_DATE_DAY;
            498: Month, FILTER_CHANGED_DATE_MONTH;
            500: U16, FILTER_CHANGED_DATE_YEAR;
            528: Bool, BOOST_TIMER_ENABLED;
            530: Bool, FIREPLACE_TIMER_ENABLED;
        }
    };
}

macro_rules! make_lists {
    ($($offset: literal: $dt: ident, $name: ident;)+) => {
        pub(crate) mod offsets {
            $(pub const $name: usize = $offset;)*
        }
        pub static OFFSETS: &[usize] = &[$($offset),*];
        pub static NAMES: &[&str] = &[$(stringify!($name)),*];
        pub static DATA_TYPES: &[DataType] = &[$(DataType::$dt),*];
    };
}

for_each_status_field!(make_lists);

#[derive(Clone, Copy)]
pub struct FieldIndex(usize);

impl FieldIndex {
    pub fn all() -> impl Iterator<Item = FieldIndex> {
        (0..OFFSETS.len()).map(Self)
    }

    pub fn from_name(name: &str) -> Option<FieldIndex> {
        let index = NAMES.iter().position(|v| *v == name);
        index.map(Self)
    }

    pub fn offset(&self) -> usize {
        OFFSETS[self.0]
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    pub fn data_type(&self) -> DataType {
        DATA_TYPES[self.0]
    }

    pub fn extract(&self, table: &[u8]) -> Value {
        self.data_type().extract(word(table, self.offset()))
    }
}

fn word(table: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([table[offset], table[offset + 1]])
}

fn temperature(table: &[u8], offset: usize) -> f64 {
    centi_kelvin_to_celsius(word(table, offset))
}

fn boolean(table: &[u8], offset: usize) -> bool {
    word(table, offset) == 1
}

/// One decoded status table. Everything observable about the unit at the time
/// of the read.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeviceStatus {
    pub profile: u16,
    pub fan_speed_percentage: u16,
    pub fan_speed_extract: u16,
    pub fan_speed_supply: u16,
    pub temp_inside: f64,
    pub temp_exhaust: f64,
    pub temp_outside: f64,
    pub temp_incoming_before_heating: f64,
    pub temp_incoming: f64,
    pub humidity: u16,
    pub co2: u16,
    pub boost_timer: u16,
    pub fireplace_timer: u16,
    pub cell_state: u16,
    pub uptime_years: u16,
    pub uptime_hours: u16,
    pub uptime_hours_current: u16,
    pub remaining_time_for_filter: u16,
    pub filter_changed_date_day: u16,
    pub filter_changed_date_month: u16,
    pub filter_changed_date_year: u16,
    pub extract_fan_balance_base: u16,
    pub supply_fan_balance_base: u16,
    pub home_speed_setting: u16,
    pub away_speed_setting: u16,
    pub boost_speed_setting: u16,
    pub fireplace_extract_fan: u16,
    pub fireplace_supply_fan: u16,
    pub home_air_temp_target: f64,
    pub away_air_temp_target: f64,
    pub boost_air_temp_target: f64,
    pub boost_time: u16,
    pub boost_timer_enabled: bool,
    pub fireplace_time: u16,
    pub fireplace_timer_enabled: bool,
    pub weekly_timer_enabled: bool,
}

impl DeviceStatus {
    /// Extracts every field from a full status table.
    ///
    /// The table must hold at least [`MIN_TABLE_WORDS`] big-endian words; the
    /// length check lives in the response decoder.
    pub fn from_table(table: &[u8]) -> DeviceStatus {
        use offsets::*;
        DeviceStatus {
            profile: word(table, PROFILE),
            fan_speed_percentage: word(table, FAN_SPEED_PERCENTAGE),
            fan_speed_extract: word(table, FAN_SPEED_EXTRACT),
            fan_speed_supply: word(table, FAN_SPEED_SUPPLY),
            temp_inside: temperature(table, TEMP_INSIDE),
            temp_exhaust: temperature(table, TEMP_EXHAUST),
            temp_outside: temperature(table, TEMP_OUTSIDE),
            temp_incoming_before_heating: temperature(table, TEMP_INCOMING_BEFORE_HEATING),
            temp_incoming: temperature(table, TEMP_INCOMING),
            humidity: word(table, HUMIDITY),
            co2: word(table, CO2),
            boost_timer: word(table, BOOST_TIMER),
            fireplace_timer: word(table, FIREPLACE_TIMER),
            cell_state: word(table, CELL_STATE),
            uptime_years: word(table, UPTIME_YEARS),
            uptime_hours: word(table, UPTIME_HOURS),
            uptime_hours_current: word(table, UPTIME_HOURS_CURRENT),
            remaining_time_for_filter: word(table, REMAINING_TIME_FOR_FILTER),
            filter_changed_date_day: word(table, FILTER_CHANGED_DATE_DAY),
            // Stored zero-based on the wire.
            filter_changed_date_month: word(table, FILTER_CHANGED_DATE_MONTH) + 1,
            filter_changed_date_year: word(table, FILTER_CHANGED_DATE_YEAR),
            extract_fan_balance_base: word(table, EXTRACT_FAN_BALANCE_BASE),
            supply_fan_balance_base: word(table, SUPPLY_FAN_BALANCE_BASE),
            home_speed_setting: word(table, HOME_SPEED_SETTING),
            away_speed_setting: word(table, AWAY_SPEED_SETTING),
            boost_speed_setting: word(table, BOOST_SPEED_SETTING),
            fireplace_extract_fan: word(table, FIREPLACE_EXTRACT_FAN),
            fireplace_supply_fan: word(table, FIREPLACE_SUPPLY_FAN),
            home_air_temp_target: temperature(table, HOME_AIR_TEMP_TARGET),
            away_air_temp_target: temperature(table, AWAY_AIR_TEMP_TARGET),
            boost_air_temp_target: temperature(table, BOOST_AIR_TEMP_TARGET),
            boost_time: word(table, BOOST_TIME),
            boost_timer_enabled: boolean(table, BOOST_TIMER_ENABLED),
            fireplace_time: word(table, FIREPLACE_TIME),
            fireplace_timer_enabled: boolean(table, FIREPLACE_TIMER_ENABLED),
            weekly_timer_enabled: boolean(table, WEEKLY_TIMER_ENABLED),
        }
    }

    /// The active profile, if the reported id is one of the four known ones.
    pub fn active_profile(&self) -> Option<Profile> {
        Profile::from_u16(self.profile)
    }

    /// Field name and value pairs in status table order, for tabular output.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Value)> {
        [
            ("FAN_SPEED_PERCENTAGE", Value::U16(self.fan_speed_percentage)),
            ("TEMP_INSIDE", Value::Celsius(self.temp_inside)),
            ("TEMP_EXHAUST", Value::Celsius(self.temp_exhaust)),
            ("TEMP_OUTSIDE", Value::Celsius(self.temp_outside)),
            (
                "TEMP_INCOMING_BEFORE_HEATING",
                Value::Celsius(self.temp_incoming_before_heating),
            ),
            ("TEMP_INCOMING", Value::Celsius(self.temp_incoming)),
            ("FAN_SPEED_EXTRACT", Value::U16(self.fan_speed_extract)),
            ("FAN_SPEED_SUPPLY", Value::U16(self.fan_speed_supply)),
            ("HUMIDITY", Value::U16(self.humidity)),
            ("CO2", Value::U16(self.co2)),
            ("PROFILE", Value::U16(self.profile)),
            ("BOOST_TIMER", Value::U16(self.boost_timer)),
            ("FIREPLACE_TIMER", Value::U16(self.fireplace_timer)),
            ("WEEKLY_TIMER_ENABLED", Value::Bool(self.weekly_timer_enabled)),
            ("CELL_STATE", Value::U16(self.cell_state)),
            ("UPTIME_YEARS", Value::U16(self.uptime_years)),
            ("UPTIME_HOURS", Value::U16(self.uptime_hours)),
            ("UPTIME_HOURS_CURRENT", Value::U16(self.uptime_hours_current)),
            ("REMAINING_TIME_FOR_FILTER", Value::U16(self.remaining_time_for_filter)),
            ("EXTRACT_FAN_BALANCE_BASE", Value::U16(self.extract_fan_balance_base)),
            ("SUPPLY_FAN_BALANCE_BASE", Value::U16(self.supply_fan_balance_base)),
            ("FIREPLACE_EXTRACT_FAN", Value::U16(self.fireplace_extract_fan)),
            ("FIREPLACE_SUPPLY_FAN", Value::U16(self.fireplace_supply_fan)),
            ("AWAY_SPEED_SETTING", Value::U16(self.away_speed_setting)),
            ("AWAY_AIR_TEMP_TARGET", Value::Celsius(self.away_air_temp_target)),
            ("HOME_SPEED_SETTING", Value::U16(self.home_speed_setting)),
            ("HOME_AIR_TEMP_TARGET", Value::Celsius(self.home_air_temp_target)),
            ("BOOST_SPEED_SETTING", Value::U16(self.boost_speed_setting)),
            ("BOOST_AIR_TEMP_TARGET", Value::Celsius(self.boost_air_temp_target)),
            ("BOOST_TIME", Value::U16(self.boost_time)),
            ("FIREPLACE_TIME", Value::U16(self.fireplace_time)),
            ("FILTER_CHANGED_DATE_DAY", Value::U16(self.filter_changed_date_day)),
            ("FILTER_CHANGED_DATE_MONTH", Value::U16(self.filter_changed_date_month)),
            ("FILTER_CHANGED_DATE_YEAR", Value::U16(self.filter_changed_date_year)),
            ("BOOST_TIMER_ENABLED", Value::Bool(self.boost_timer_enabled)),
            ("FIREPLACE_TIMER_ENABLED", Value::Bool(self.fireplace_timer_enabled)),
        ]
        .into_iter()
    }
}
