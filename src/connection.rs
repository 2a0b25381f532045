use std::sync::Mutex;
use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace};

use crate::messages::{self, DataMode, Response, TimerMemory};
use crate::registers::Profile;
use crate::status::DeviceStatus;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not connect to `{1}` over websocket")]
    Connect(#[source] tungstenite::Error, String),
    #[error("could not send out the request frame")]
    Send(#[source] tungstenite::Error),
    #[error("could not read data from the stream")]
    Receive(#[source] tungstenite::Error),
    #[error("connection closed before a response frame arrived")]
    ConnectionClosed,
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),
    #[error("invalid request")]
    Request(#[source] messages::RequestError),
    #[error("could not decode the response")]
    Protocol(#[source] messages::ProtocolError),
}

#[derive(clap::Parser, Clone)]
#[group(id = "connection::Args")]
pub struct Args {
    /// Host name or address of the ventilation unit.
    #[arg(long)]
    host: String,

    /// TCP port of the unit's websocket endpoint.
    #[arg(long, default_value = "80")]
    port: u16,

    /// Consider the transaction failed if no response frame arrives within
    /// this amount of time.
    #[arg(long, default_value = "5s")]
    response_timeout: humantime::Duration,
}

impl Args {
    pub fn client(&self) -> Client {
        Client::new(self.host.clone(), self.port).with_response_timeout(*self.response_timeout)
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A client for one unit, holding everything that must survive between
/// transactions (the remembered timer durations).
///
/// Each operation opens a fresh websocket session, sends exactly one request
/// frame, waits for exactly one response frame and closes the session. There
/// is no pipelining and no internal retry; callers wanting concurrency must
/// serialize transactions themselves.
pub struct Client {
    host: String,
    port: u16,
    response_timeout: Duration,
    timers: Mutex<TimerMemory>,
}

impl Client {
    pub fn new(host: impl Into<String>, port: u16) -> Client {
        Client {
            host: host.into(),
            port,
            response_timeout: Duration::from_secs(5),
            timers: Mutex::new(TimerMemory::default()),
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Client {
        self.response_timeout = timeout;
        self
    }

    /// Reads the full status table.
    pub async fn read_status(&self) -> Result<DeviceStatus, Error> {
        let request = messages::READ_TABLES_REQUEST.to_vec();
        match self.transact(DataMode::ReadTables, request).await? {
            Response::Status(status) => Ok(*status),
            Response::Ack => unreachable!("READ_TABLES decoding never yields a bare ack"),
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<(), Error> {
        self.write(messages::power_request(on)).await
    }

    pub async fn switch_profile(&self, profile: Profile) -> Result<(), Error> {
        let request = {
            let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            messages::switch_profile_request(profile, &timers)
        };
        self.write(request).await
    }

    pub async fn set_fan_speed(&self, profile: Profile, percent: u8) -> Result<(), Error> {
        let request = messages::fan_speed_request(profile, percent).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_extract_fan_balance(&self, percent: u8) -> Result<(), Error> {
        let request = messages::extract_fan_balance_request(percent).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_supply_fan_balance(&self, percent: u8) -> Result<(), Error> {
        let request = messages::supply_fan_balance_request(percent).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_fireplace_extract_fan(&self, percent: u8) -> Result<(), Error> {
        let request = messages::fireplace_extract_fan_request(percent).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_fireplace_supply_fan(&self, percent: u8) -> Result<(), Error> {
        let request = messages::fireplace_supply_fan_request(percent).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_target_temperature(&self, profile: Profile, celsius: u8) -> Result<(), Error> {
        let request =
            messages::target_temperature_request(profile, celsius).map_err(Error::Request)?;
        self.write(request).await
    }

    pub async fn set_boost_time(&self, minutes: u16) -> Result<(), Error> {
        let request = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            messages::boost_time_request(minutes, &mut timers)
        };
        self.write(request).await
    }

    pub async fn set_boost_timer_enabled(&self, enabled: bool) -> Result<(), Error> {
        let request = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            messages::boost_timer_enabled_request(enabled, &mut timers)
        };
        self.write(request).await
    }

    pub async fn set_fireplace_time(&self, minutes: u16) -> Result<(), Error> {
        let request = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            messages::fireplace_time_request(minutes, &mut timers)
        };
        self.write(request).await
    }

    pub async fn set_fireplace_timer_enabled(&self, enabled: bool) -> Result<(), Error> {
        let request = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            messages::fireplace_timer_enabled_request(enabled, &mut timers)
        };
        self.write(request).await
    }

    pub async fn set_weekly_timer_enabled(&self, enabled: bool) -> Result<(), Error> {
        self.write(messages::weekly_timer_enabled_request(enabled)).await
    }

    async fn write(&self, request: Vec<u8>) -> Result<(), Error> {
        match self.transact(DataMode::WriteData, request).await? {
            Response::Ack => Ok(()),
            Response::Status(_) => unreachable!("WRITE_DATA decoding never yields a status"),
        }
    }

    /// One request, one response.
    async fn transact(&self, mode: DataMode, request: Vec<u8>) -> Result<Response, Error> {
        let url = format!("ws://{}:{}/", self.host, self.port);
        info!(message = "connecting...", url);
        let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Connect(e, url))?;
        debug!(message = "connected, sending the request", length = request.len());
        stream.send(Message::Binary(request.into())).await.map_err(Error::Send)?;
        let frame = tokio::time::timeout(self.response_timeout, receive_binary(&mut stream))
            .await
            .map_err(|_| Error::ResponseTimeout(self.response_timeout))??;
        trace!(message = "received a response frame", length = frame.len());
        // The session is over either way; decode failures shouldn't leave the
        // socket dangling.
        if let Err(e) = stream.close(None).await {
            debug!(
                message = "closing the session failed",
                error = (&e as &dyn std::error::Error)
            );
        }
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        messages::decode_response(mode, &frame, &mut timers).map_err(Error::Protocol)
    }
}

async fn receive_binary(stream: &mut WsStream) -> Result<tungstenite::Bytes, Error> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(Error::ConnectionClosed);
        };
        match message.map_err(Error::Receive)? {
            Message::Binary(payload) => return Ok(payload),
            Message::Close(_) => return Err(Error::ConnectionClosed),
            // The unit only ever responds with binary frames; anything else
            // is transport chatter.
            other => trace!(message = "ignoring a non-binary frame", ?other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers;
    use crate::status::tests::captured_table;

    /// Accepts one websocket session per canned response, captures the
    /// request frame and answers with the canned bytes.
    async fn serve(responses: Vec<Vec<u8>>) -> (u16, tokio::task::JoinHandle<Vec<Vec<u8>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let worker = tokio::task::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let request = loop {
                    match ws.next().await.unwrap().unwrap() {
                        Message::Binary(payload) => break payload.to_vec(),
                        _ => continue,
                    }
                };
                requests.push(request);
                ws.send(Message::Binary(response.into())).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            }
            requests
        });
        (port, worker)
    }

    const ACK_FRAME: [u8; 6] = [2, 0, 245, 0, 247, 0];

    #[tokio::test]
    async fn write_round_trip() {
        let (port, worker) = serve(vec![ACK_FRAME.to_vec()]).await;
        let client = Client::new("127.0.0.1", port);
        client.set_power(true).await.unwrap();
        assert_eq!(worker.await.unwrap(), vec![messages::power_request(true)]);
    }

    #[tokio::test]
    async fn status_read_feeds_later_profile_switches() {
        let (port, worker) = serve(vec![captured_table(), ACK_FRAME.to_vec()]).await;
        let client = Client::new("127.0.0.1", port);

        let status = client.read_status().await.unwrap();
        assert_eq!(status.fan_speed_percentage, 50);
        assert_eq!(status.fireplace_time, 240);

        // The observed 240 minute fireplace duration goes out with the switch.
        client.switch_profile(Profile::Fireplace).await.unwrap();
        let requests = worker.await.unwrap();
        assert_eq!(requests[0], messages::READ_TABLES_REQUEST.to_vec());
        assert_eq!(
            requests[1],
            messages::write_request(&[
                (registers::BOOST_TIMER, 0),
                (registers::FIREPLACE_TIMER, 240),
            ]),
        );
    }

    #[tokio::test]
    async fn rejected_write_surfaces_as_a_protocol_error() {
        let (port, _worker) = serve(vec![vec![2, 0, 0, 0, 2, 0]]).await;
        let client = Client::new("127.0.0.1", port);
        let result = client.set_power(false).await;
        assert!(matches!(result, Err(Error::Protocol(messages::ProtocolError::WriteRejected))));
    }

    #[tokio::test]
    async fn invalid_arguments_never_touch_the_network() {
        // No server anywhere near this client.
        let client = Client::new("192.0.2.1", 80);
        let result = client.set_fan_speed(Profile::Fireplace, 50).await;
        assert!(matches!(
            result,
            Err(Error::Request(messages::RequestError::FanSpeedProfile(Profile::Fireplace)))
        ));
        let result = client.set_target_temperature(Profile::AtHome, 30).await;
        assert!(matches!(
            result,
            Err(Error::Request(messages::RequestError::TargetTemperatureRange(30)))
        ));
    }

    #[tokio::test]
    async fn missing_response_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let worker = tokio::task::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Swallow the request and go quiet.
            while let Some(Ok(_)) = ws.next().await {}
        });
        let client =
            Client::new("127.0.0.1", port).with_response_timeout(Duration::from_millis(100));
        let result = client.set_power(true).await;
        assert!(matches!(result, Err(Error::ResponseTimeout(_))));
        worker.abort();
    }
}
