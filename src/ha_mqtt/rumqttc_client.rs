use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::client::{InboundMessage, MqttClient};
use crate::error::ClientError;

/// Capacity of the request channel between the client and its event loop.
const REQUEST_CAPACITY: usize = 64;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// How long `disconnect` waits for the DISCONNECT packet to go out.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection state as last reported by the event loop task.
#[derive(Debug, Clone, PartialEq)]
enum LinkState {
    Connecting,
    Up,
    Down(String),
    Closed,
}

struct Connection {
    client: AsyncClient,
    state: watch::Receiver<LinkState>,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
    task: JoinHandle<()>,
}

/// [`MqttClient`] backed by rumqttc.
///
/// The rumqttc event loop runs uninterrupted as a task on a runtime owned by
/// the client. Requests go through rumqttc's request channel, inbound
/// publishes come back through an unbounded channel and are drained by
/// `check_msg`. While the broker connection is down every call fails, so the
/// caller sees the outage instead of queueing into a dead link.
///
/// rumqttc emits PINGREQ on its own from the keep-alive configured in
/// [`MqttOptions`], so `ping` only reports whether the link is up.
pub struct RumqttcClient {
    options: MqttOptions,
    last_will_topic: Option<String>,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    runtime: Runtime,
    connection: Option<Connection>,
}

impl RumqttcClient {
    pub fn new(options: MqttOptions) -> Result<Self, ClientError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mqtt-event-loop")
            .enable_all()
            .build()
            .map_err(|e| ClientError::Connect(Box::new(e)))?;

        Ok(Self {
            options,
            last_will_topic: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            runtime,
            connection: None,
        })
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Pause between a connection error and the next reconnect attempt.
    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    fn not_connected() -> ClientError {
        ClientError::Connection("client is not connected".into())
    }

    /// The live connection, or an error while the broker link is down.
    fn link(&mut self) -> Result<&mut Connection, ClientError> {
        let connection = self.connection.as_mut().ok_or_else(Self::not_connected)?;
        let state = connection.state.borrow().clone();
        match state {
            LinkState::Up => Ok(connection),
            LinkState::Down(reason) => Err(ClientError::Connection(
                format!("broker connection lost: {reason}").into(),
            )),
            LinkState::Connecting => {
                Err(ClientError::Connection("reconnecting to broker".into()))
            }
            LinkState::Closed => Err(Self::not_connected()),
        }
    }
}

/// Polls the event loop until the link is closed or the client goes away.
async fn run_event_loop(
    mut eventloop: EventLoop,
    state: watch::Sender<LinkState>,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    reconnect_delay: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                trace!("Received message on '{}'", publish.topic);
                let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                if inbound.send(message).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(
                    "Connected to MQTT broker (session present: {})",
                    ack.session_present
                );
                state.send_replace(LinkState::Up);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Disconnect sent, stopping event loop");
                break;
            }
            Ok(event) => {
                trace!("MQTT event: {:?}", event);
            }
            Err(e) => {
                warn!("MQTT connection error: {}", e);
                state.send_replace(LinkState::Down(e.to_string()));
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
    state.send_replace(LinkState::Closed);
}

impl MqttClient for RumqttcClient {
    fn keepalive(&self) -> Duration {
        self.options.keep_alive()
    }

    fn set_last_will(&mut self, topic: &str, payload: &str, retain: bool) {
        let will = LastWill::new(topic, payload.to_string(), QoS::AtLeastOnce, retain);
        self.options.set_last_will(will);
        self.last_will_topic = Some(topic.to_string());
    }

    fn last_will_topic(&self) -> Option<&str> {
        self.last_will_topic.as_deref()
    }

    fn connect(&mut self) -> Result<(), ClientError> {
        if let Some(previous) = self.connection.take() {
            previous.task.abort();
        }

        debug!("Creating MQTT client");
        let (client, eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        let (state_tx, mut state) = watch::channel(LinkState::Connecting);
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let task = self.runtime.spawn(run_event_loop(
            eventloop,
            state_tx,
            inbound_tx,
            self.reconnect_delay,
        ));

        let outcome = self.runtime.block_on(async {
            timeout(
                self.connect_timeout,
                state.wait_for(|state| *state != LinkState::Connecting),
            )
            .await
            .map(|changed| changed.map(|state| state.clone()))
        });

        match outcome {
            Ok(Ok(LinkState::Up)) => {
                self.connection = Some(Connection {
                    client,
                    state,
                    inbound,
                    task,
                });
                Ok(())
            }
            Ok(Ok(LinkState::Down(reason))) => {
                task.abort();
                Err(ClientError::Connect(reason.into()))
            }
            Ok(Ok(state)) => {
                task.abort();
                Err(ClientError::Connect(
                    format!("event loop stopped while connecting ({state:?})").into(),
                ))
            }
            Ok(Err(closed)) => {
                task.abort();
                Err(ClientError::Connect(Box::new(closed)))
            }
            Err(elapsed) => {
                task.abort();
                Err(ClientError::Connect(Box::new(elapsed)))
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ClientError> {
        self.link()?
            .client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
            .map_err(|e| ClientError::Request(Box::new(e)))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError> {
        self.link()?
            .client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| ClientError::Request(Box::new(e)))
    }

    fn ping(&mut self) -> Result<(), ClientError> {
        self.link().map(|_| ())
    }

    fn check_msg(&mut self) -> Result<Vec<InboundMessage>, ClientError> {
        let link = self.link()?;
        let mut messages = Vec::new();
        while let Ok(message) = link.inbound.try_recv() {
            messages.push(message);
        }
        Ok(messages)
    }

    fn disconnect(&mut self) -> Result<(), ClientError> {
        let Some(mut connection) = self.connection.take() else {
            return Err(Self::not_connected());
        };

        let requested = connection
            .client
            .try_disconnect()
            .map_err(|e| ClientError::Request(Box::new(e)));
        if requested.is_ok() {
            let closed = self.runtime.block_on(async {
                timeout(
                    DISCONNECT_TIMEOUT,
                    connection.state.wait_for(|state| *state == LinkState::Closed),
                )
                .await
            });
            if closed.is_err() {
                debug!("Event loop did not close within {:?}", DISCONNECT_TIMEOUT);
            }
        }
        connection.task.abort();
        requested
    }
}
