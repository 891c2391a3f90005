use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use settlement_common::{GatewayStatus, Money, PaymentStatusReport};
use settlement_engine::traits::{
    DeliveryError,
    DeliveryResponse,
    GatewayError,
    PaymentStatusProvider,
    WebhookRequest,
    WebhookTransport,
};

/// A payment gateway that answers from a fixed table. Unlisted references are unknown to it.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    responses: Arc<Mutex<HashMap<String, Result<PaymentStatusReport, GatewayError>>>>,
    slow: Arc<Mutex<HashSet<String>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn with_status(self, reference: &str, status: &str) -> Self {
        let report = PaymentStatusReport::new(reference, GatewayStatus::from(status));
        self.responses.lock().unwrap().insert(reference.to_string(), Ok(report));
        self
    }

    pub fn with_approval(self, reference: &str, amount: Money) -> Self {
        let report = PaymentStatusReport::new(reference, GatewayStatus::Approved).with_amount(amount);
        self.responses.lock().unwrap().insert(reference.to_string(), Ok(report));
        self
    }

    pub fn with_error(self, reference: &str, error: GatewayError) -> Self {
        self.responses.lock().unwrap().insert(reference.to_string(), Err(error));
        self
    }

    /// The gateway never answers in a reasonable time for this reference.
    pub fn with_hang(self, reference: &str) -> Self {
        self.slow.lock().unwrap().insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentStatusProvider for FakeGateway {
    async fn fetch_status(&self, payment_reference: &str) -> Result<PaymentStatusReport, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hang = self.slow.lock().unwrap().contains(payment_reference);
        if hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let response = self.responses.lock().unwrap().get(payment_reference).cloned();
        response.unwrap_or_else(|| Err(GatewayError::UnknownReference(payment_reference.to_string())))
    }
}

/// Records every webhook request and answers with a canned response.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<WebhookRequest>>>,
    response: Arc<Mutex<Result<DeliveryResponse, DeliveryError>>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::responding(200, "ok")
    }
}

impl RecordingTransport {
    pub fn responding(status: u16, body: &str) -> Self {
        let response = Ok(DeliveryResponse { status, body: body.to_string() });
        Self { requests: Arc::new(Mutex::new(Vec::new())), response: Arc::new(Mutex::new(response)) }
    }

    pub fn unreachable() -> Self {
        let transport = Self::default();
        transport.set_response(Err(DeliveryError::Network("connection refused".into())));
        transport
    }

    pub fn set_response(&self, response: Result<DeliveryResponse, DeliveryError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl WebhookTransport for RecordingTransport {
    async fn deliver(&self, request: &WebhookRequest) -> Result<DeliveryResponse, DeliveryError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self.response.lock().unwrap().clone();
        response
    }
}
