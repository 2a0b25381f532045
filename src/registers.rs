#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum DataType {
    /// Plain big-endian 16-bit quantity.
    U16,
    /// Centi-Kelvin on the wire, reported as °C.
    Celsius,
    /// 16-bit word where exactly 1 means `true`.
    Bool,
    /// Zero-based month on the wire, reported one-based.
    Month,
}

impl DataType {
    pub fn extract(self, raw: u16) -> Value {
        match self {
            Self::U16 => Value::U16(raw),
            Self::Celsius => Value::Celsius(centi_kelvin_to_celsius(raw)),
            Self::Bool => Value::Bool(raw == 1),
            Self::Month => Value::U16(raw + 1),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::U16 => "u16",
            Self::Celsius => "°C",
            Self::Bool => "bool",
            Self::Month => "month",
        })
    }
}

pub fn centi_kelvin_to_celsius(raw: u16) -> f64 {
    f64::from(i32::from(raw) - 27315) / 100.0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    U16(u16),
    Celsius(f64),
    Bool(bool),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Value::U16(n) => f.write_fmt(format_args!("{}", n)),
            Value::Celsius(n) => f.write_fmt(format_args!("{}", n)),
            Value::Bool(b) => f.write_fmt(format_args!("{}", b)),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::U16(n) => serializer.serialize_u16(n),
            Value::Celsius(n) => serializer.serialize_f64(n),
            Value::Bool(b) => serializer.serialize_bool(b),
        }
    }
}

/// The four operating profiles selectable on the unit.
///
/// The discriminants match the profile id reported in the status table.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    clap::ValueEnum,
    strum::Display,
    num_derive::FromPrimitive,
    serde::Serialize,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Profile {
    AtHome = 0,
    Away = 1,
    Boost = 2,
    Fireplace = 3,
}

macro_rules! for_each_parameter {
    ($m:ident) => {
        $m! {
            4609: PROFILE_AWAY, min = 0, max = 1;
            4610: UNIT_POWER, min = 0, max = 1;
            4612: BOOST_TIMER, min = 0, max = 240;
            4613: FIREPLACE_TIMER, min = 0, max = 240;
            4615: WEEKLY_TIMER_ENABLED, min = 0, max = 1;
            20485: EXTRACT_FAN_BALANCE_BASE, min = 0, max = 100;
            20486: SUPPLY_FAN_BALANCE_BASE, min = 0, max = 100;
            20487: FIREPLACE_EXTRACT_FAN, min = 0, max = 100;
            20488: FIREPLACE_SUPPLY_FAN, min = 0, max = 100;
            20501: AWAY_FAN_SPEED, min = 0, max = 100;
            20502: AWAY_TARGET_TEMPERATURE, min = 5, max = 25;
            20507: HOME_FAN_SPEED, min = 0, max = 100;
            20508: HOME_TARGET_TEMPERATURE, min = 5, max = 25;
            20513: BOOST_FAN_SPEED, min = 0, max = 100;
            20514: BOOST_TARGET_TEMPERATURE, min = 5, max = 25;
            20544: BOOST_TIME, min = 0, max = 240;
            20545: FIREPLACE_TIME, min = 0, max = 240;
            21766: BOOST_TIMER_ENABLED, min = 0, max = 1;
            21767: FIREPLACE_TIMER_ENABLED, min = 0, max = 1;
        }
    };
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! make_lists {
    ($($address: literal: $name: ident $(, min = $min: literal)? $(, max = $max: literal)?;)+) => {
        $(pub const $name: u16 = $address;)*
        pub static ADDRESSES: &[u16] = &[$($address),*];
        pub static NAMES: &[&str] = &[$(stringify!($name)),*];
        pub static MINIMUM_VALUES: &[Option<u16>] = &[$(optional!($($min)?)),*];
        pub static MAXIMUM_VALUES: &[Option<u16>] = &[$(optional!($($max)?)),*];
    };
}

for_each_parameter!(make_lists);

pub static DESCRIPTIONS: &[&str] = &const {
    let mut result = [""; ADDRESSES.len()];
    let mut index = 0;
    let mut previous_address = 0;
    while index < result.len() {
        let address = ADDRESSES[index];
        if address <= previous_address {
            panic!("ADDRESSES is not sorted (or has duplicate values)!");
        }
        previous_address = address;
        result[index] = match address {
            4609 => "Away state. Writing 1 selects the away profile, 0 leaves it",
            4610 => "Unit power. 1=On, 0=Off",
            4612 => "Boost countdown. Writing a minute count starts the boost profile",
            4613 => "Fireplace countdown. Writing a minute count starts the fireplace profile",
            4615 => "Flag indicating whether the weekly timer programme runs",
            20485 => "Base extract fan speed used for balancing, percent",
            20486 => "Base supply fan speed used for balancing, percent",
            20487 => "Extract fan speed while the fireplace profile is active, percent",
            20488 => "Supply fan speed while the fireplace profile is active, percent",
            20501 => "Fan speed setting for the away profile, percent",
            20502 => "Supply air temperature target for the away profile, °C",
            20507 => "Fan speed setting for the at-home profile, percent",
            20508 => "Supply air temperature target for the at-home profile, °C",
            20513 => "Fan speed setting for the boost profile, percent",
            20514 => "Supply air temperature target for the boost profile, °C",
            20544 => "Duration a boost period runs for, minutes",
            20545 => "Duration a fireplace period runs for, minutes",
            21766 => "Flag indicating whether the boost countdown is honoured",
            21767 => "Flag indicating whether the fireplace countdown is honoured",
            _ => panic!("parameter is missing a description"),
        };
        index += 1;
    }
    result
};

#[derive(Clone, Copy)]
pub struct ParameterIndex(usize);

impl ParameterIndex {
    pub fn from_address(address: u16) -> Option<ParameterIndex> {
        let index = ADDRESSES.partition_point(|v| *v < address);
        (index < ADDRESSES.len() && ADDRESSES[index] == address).then_some(Self(index))
    }

    pub fn from_name(name: &str) -> Option<ParameterIndex> {
        let index = NAMES.iter().position(|v| *v == name);
        index.map(Self)
    }

    pub fn all() -> impl Iterator<Item = ParameterIndex> {
        (0..ADDRESSES.len()).map(Self)
    }

    pub fn address(&self) -> u16 {
        ADDRESSES[self.0]
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    pub fn minimum(&self) -> Option<u16> {
        MINIMUM_VALUES[self.0]
    }

    pub fn maximum(&self) -> Option<u16> {
        MAXIMUM_VALUES[self.0]
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTIONS[self.0]
    }
}
