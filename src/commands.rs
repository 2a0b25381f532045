pub mod registers {
    use crate::output;
    use crate::registers::ParameterIndex;

    /// Search and output the writable parameter addresses known to this tool.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Only list parameters whose name, address or description contains
        /// this string.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not produce the output")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    struct Record {
        address: u16,
        name: &'static str,
        minimum: Option<u16>,
        maximum: Option<u16>,
        description: &'static str,
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output
            .table_headers(vec!["Address", "Name", "Min", "Max", "Description"])
            .map_err(Error::Output)?;
        for parameter in ParameterIndex::all() {
            if let Some(pattern) = &args.filter {
                if !is_match(parameter, pattern) {
                    continue;
                }
            }
            output
                .result(
                    || {
                        vec![
                            parameter.address().to_string(),
                            parameter.name().to_string(),
                            parameter.minimum().map(|v| v.to_string()).unwrap_or_default(),
                            parameter.maximum().map(|v| v.to_string()).unwrap_or_default(),
                            parameter.description().to_string(),
                        ]
                    },
                    || Record {
                        address: parameter.address(),
                        name: parameter.name(),
                        minimum: parameter.minimum(),
                        maximum: parameter.maximum(),
                        description: parameter.description(),
                    },
                )
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }

    fn is_match(parameter: ParameterIndex, pattern: &str) -> bool {
        let pattern = pattern.to_uppercase();
        parameter.name().contains(&pattern)
            || parameter.description().to_uppercase().contains(&pattern)
            || parameter.address().to_string().contains(&pattern)
    }
}

pub mod fields {
    use crate::output;
    use crate::registers::DataType;
    use crate::status::FieldIndex;

    /// Output the status table layout: byte offsets, names and data types.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Only list fields whose name contains this string.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not produce the output")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    struct Record {
        offset: usize,
        name: &'static str,
        data_type: DataType,
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output.table_headers(vec!["Offset", "Name", "Type"]).map_err(Error::Output)?;
        for field in FieldIndex::all() {
            if let Some(pattern) = &args.filter {
                if !field.name().contains(&pattern.to_uppercase()) {
                    continue;
                }
            }
            output
                .result(
                    || {
                        vec![
                            field.offset().to_string(),
                            field.name().to_string(),
                            field.data_type().to_string(),
                        ]
                    },
                    || Record {
                        offset: field.offset(),
                        name: field.name(),
                        data_type: field.data_type(),
                    },
                )
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod status {
    use crate::{connection, output};

    /// Read the full status table from the unit and output every field.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        #[clap(flatten)]
        output: output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not start the async runtime")]
        Runtime(#[source] std::io::Error),
        #[error("the status read transaction failed")]
        Transaction(#[source] connection::Error),
        #[error("could not produce the output")]
        Output(#[source] output::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let client = args.connection.client();
        let status = runtime.block_on(client.read_status()).map_err(Error::Transaction)?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output.table_headers(vec!["Field", "Value"]).map_err(Error::Output)?;
        for (name, value) in status.fields() {
            output
                .result(
                    || vec![name.to_string(), value.to_string()],
                    || serde_json::json!({ "field": name, "value": value }),
                )
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod set {
    use crate::connection;
    use crate::registers::Profile;

    /// Write one parameter (or switch the profile) on the unit.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        connection: connection::Args,
        #[clap(subcommand)]
        operation: Operation,
    }

    #[derive(clap::Subcommand)]
    pub enum Operation {
        /// Turn the unit on or off.
        Power {
            #[arg(value_enum)]
            state: State,
        },
        /// Switch the active profile.
        Profile {
            #[arg(value_enum)]
            profile: Profile,
        },
        /// Set the fan speed percentage for a profile.
        FanSpeed {
            #[arg(value_enum)]
            profile: Profile,
            percent: u8,
        },
        /// Set the supply air temperature target for a profile, °C.
        TargetTemperature {
            #[arg(value_enum)]
            profile: Profile,
            celsius: u8,
        },
        /// Set the extract fan balance base percentage.
        ExtractFanBalance { percent: u8 },
        /// Set the supply fan balance base percentage.
        SupplyFanBalance { percent: u8 },
        /// Set the extract fan speed for the fireplace profile.
        FireplaceExtractFan { percent: u8 },
        /// Set the supply fan speed for the fireplace profile.
        FireplaceSupplyFan { percent: u8 },
        /// Set how long a boost period runs, minutes.
        BoostTime { minutes: u16 },
        /// Enable or disable the boost countdown.
        BoostTimer {
            #[arg(value_enum)]
            state: State,
        },
        /// Set how long a fireplace period runs, minutes.
        FireplaceTime { minutes: u16 },
        /// Enable or disable the fireplace countdown.
        FireplaceTimer {
            #[arg(value_enum)]
            state: State,
        },
        /// Enable or disable the weekly timer programme.
        WeeklyTimer {
            #[arg(value_enum)]
            state: State,
        },
    }

    #[derive(clap::ValueEnum, Clone, Copy, Debug)]
    pub enum State {
        On,
        Off,
    }

    impl State {
        fn is_on(self) -> bool {
            matches!(self, State::On)
        }
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not start the async runtime")]
        Runtime(#[source] std::io::Error),
        #[error("the write transaction failed")]
        Transaction(#[source] connection::Error),
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let client = args.connection.client();
        runtime
            .block_on(async {
                match args.operation {
                    Operation::Power { state } => client.set_power(state.is_on()).await,
                    Operation::Profile { profile } => client.switch_profile(profile).await,
                    Operation::FanSpeed { profile, percent } => {
                        client.set_fan_speed(profile, percent).await
                    }
                    Operation::TargetTemperature { profile, celsius } => {
                        client.set_target_temperature(profile, celsius).await
                    }
                    Operation::ExtractFanBalance { percent } => {
                        client.set_extract_fan_balance(percent).await
                    }
                    Operation::SupplyFanBalance { percent } => {
                        client.set_supply_fan_balance(percent).await
                    }
                    Operation::FireplaceExtractFan { percent } => {
                        client.set_fireplace_extract_fan(percent).await
                    }
                    Operation::FireplaceSupplyFan { percent } => {
                        client.set_fireplace_supply_fan(percent).await
                    }
                    Operation::BoostTime { minutes } => client.set_boost_time(minutes).await,
                    Operation::BoostTimer { state } => {
                        client.set_boost_timer_enabled(state.is_on()).await
                    }
                    Operation::FireplaceTime { minutes } => {
                        client.set_fireplace_time(minutes).await
                    }
                    Operation::FireplaceTimer { state } => {
                        client.set_fireplace_timer_enabled(state.is_on()).await
                    }
                    Operation::WeeklyTimer { state } => {
                        client.set_weekly_timer_enabled(state.is_on()).await
                    }
                }
            })
            .map_err(Error::Transaction)
    }
}
