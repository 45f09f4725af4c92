//! WebSocket JSON-RPC client used to reach the wallet provider.
//!
//! A background task owns the read half of the connection and routes
//! responses to their pending callers by request id; notifications are
//! fanned out on per-event broadcast channels.

use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, error, trace, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{
    sync::{broadcast, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite_wasm::{Message, WebSocketStream};

use super::{Id, JsonRpcResult, RpcError, RpcNotification, RpcRequest, RpcResponse, JSON_RPC_VERSION};
use crate::api::NotifyEvent;

pub type SharedJsonRpcClient = Arc<WebSocketJsonRpcClient>;

type PendingRequests = Mutex<HashMap<Id, oneshot::Sender<Result<Value, RpcError>>>>;

pub struct WebSocketJsonRpcClient {
    sender: Mutex<Option<SplitSink<WebSocketStream, Message>>>,
    pending: PendingRequests,
    events: Mutex<HashMap<NotifyEvent, broadcast::Sender<Value>>>,
    online: AtomicBool,
    next_id: AtomicU64,
    connection_lost: broadcast::Sender<()>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketJsonRpcClient {
    pub async fn new(target: String) -> JsonRpcResult<SharedJsonRpcClient> {
        let ws = tokio_tungstenite_wasm::connect(target.as_str())
            .await
            .map_err(|e| RpcError::WebSocket(e.to_string()))?;
        let (sink, stream) = ws.split();

        let (connection_lost, _) = broadcast::channel(1);
        let zelf = Arc::new(Self {
            sender: Mutex::new(Some(sink)),
            pending: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            connection_lost,
            read_task: Mutex::new(None),
        });

        let task = tokio::spawn(Arc::clone(&zelf).read_loop(stream));
        *zelf.read_task.lock().await = Some(task);

        debug!("Connected to wallet provider at {}", target);
        Ok(zelf)
    }

    // is the websocket connection alive
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn on_connection_lost(&self) -> broadcast::Receiver<()> {
        self.connection_lost.subscribe()
    }

    // Close the connection; pending calls resolve with a disconnect error
    pub async fn disconnect(&self) -> JsonRpcResult<()> {
        trace!("disconnect");
        self.online.store(false, Ordering::SeqCst);

        if let Some(mut sink) = self.sender.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("Error while closing websocket sink: {}", e);
            }
        }

        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }

        self.pending.lock().await.clear();
        Ok(())
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str) -> JsonRpcResult<T> {
        // no-parameter methods still carry an empty params array
        self.call_with(method, &Vec::<Value>::new()).await
    }

    pub async fn call_with<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> JsonRpcResult<T> {
        if !self.is_online() {
            return Err(RpcError::Disconnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest {
            jsonrpc: JSON_RPC_VERSION,
            id,
            method,
            params,
        };
        let payload = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        {
            let mut sender = self.sender.lock().await;
            let sink = sender.as_mut().ok_or(RpcError::Disconnected)?;
            if let Err(e) = sink.send(Message::Text(payload.into())).await {
                self.pending.lock().await.remove(&id);
                return Err(RpcError::WebSocket(e.to_string()));
            }
        }

        let value = rx.await.map_err(|_| RpcError::Disconnected)??;
        Ok(serde_json::from_value(value)?)
    }

    // Register for a provider notification; values are decoded lazily by
    // the receiver so one slow subscriber cannot poison the others
    pub async fn subscribe_event<T: DeserializeOwned>(
        &self,
        event: NotifyEvent,
        capacity: usize,
    ) -> EventReceiver<T> {
        let mut events = self.events.lock().await;
        let sender = events.entry(event).or_insert_with(|| {
            let (sender, _) = broadcast::channel(capacity);
            sender
        });
        EventReceiver::new(sender.subscribe())
    }

    async fn read_loop(self: Arc<Self>, mut stream: SplitStream<WebSocketStream>) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(payload)) => {
                    let text: String = payload.as_str().to_string();
                    self.handle_message(&text).await;
                }
                Ok(Message::Binary(_)) => {
                    warn!("Ignoring unexpected binary frame from wallet provider");
                }
                Ok(Message::Close(_)) => {
                    debug!("Wallet provider closed the connection");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error while reading: {}", e);
                    break;
                }
            }
        }

        self.online.store(false, Ordering::SeqCst);
        // dropping the pending senders resolves callers with a disconnect
        self.pending.lock().await.clear();
        if self.connection_lost.send(()).is_err() {
            trace!("No subscriber for connection lost event");
        }
    }

    async fn handle_message(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Invalid JSON from wallet provider: {}", e);
                return;
            }
        };

        if value.get("id").map_or(false, |id| !id.is_null()) {
            match serde_json::from_value::<RpcResponse>(value) {
                Ok(response) => self.handle_response(response).await,
                Err(e) => warn!("Invalid JSON-RPC response: {}", e),
            }
        } else if value.get("method").is_some() {
            match serde_json::from_value::<RpcNotification>(value) {
                Ok(notification) => self.handle_notification(notification).await,
                Err(e) => warn!("Invalid JSON-RPC notification: {}", e),
            }
        } else {
            warn!("Unroutable message from wallet provider");
        }
    }

    async fn handle_response(&self, response: RpcResponse) {
        let id = match response.id {
            Some(id) => id,
            None => return,
        };

        let sender = match self.pending.lock().await.remove(&id) {
            Some(sender) => sender,
            None => {
                warn!("Response for unknown request id {}", id);
                return;
            }
        };

        let result = match response.error {
            Some(error) => Err(RpcError::Response(error)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        if sender.send(result).is_err() {
            debug!("Caller of request {} is gone", id);
        }
    }

    async fn handle_notification(&self, notification: RpcNotification) {
        let event = match NotifyEvent::from_method_name(&notification.method) {
            Some(event) => event,
            None => {
                trace!("Ignoring notification {}", notification.method);
                return;
            }
        };

        let events = self.events.lock().await;
        if let Some(sender) = events.get(&event) {
            if sender.send(notification.params).is_err() {
                trace!("No subscriber for event {:?}", event);
            }
        }
    }
}

pub struct EventReceiver<T: DeserializeOwned> {
    inner: broadcast::Receiver<Value>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> EventReceiver<T> {
    pub fn new(inner: broadcast::Receiver<Value>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub async fn recv(&mut self) -> JsonRpcResult<T> {
        loop {
            match self.inner.recv().await {
                Ok(value) => return Ok(serde_json::from_value(value)?),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event receiver lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(RpcError::Disconnected),
            }
        }
    }
}
