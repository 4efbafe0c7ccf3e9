//! Common test utilities for PalmPort integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use palmport_core::{Account, NewAccount, Role};
use palmport_service::crypto::hash_password;
use palmport_service::mail::{MailError, Mailer, OutboundEmail};
use palmport_service::media::{ImageHost, MediaError, QrEncoder};
use palmport_service::paystack::{
    AuthorizationHandle, Envelope, InitializeTransaction, PaymentError, PaymentGateway,
    VerifiedTransaction,
};
use palmport_service::{create_router, AppState, Integrations, ServiceConfig, TokenKeys};
use palmport_store::{MemoryStore, Store};

/// Admin address notifications go to.
pub const ADMIN_EMAIL: &str = "admin@palmport.test";

/// Password shared by the seeded accounts.
pub const PASSWORD: &str = "correct horse";

/// Gateway whose verification outcome is scripted per reference.
#[derive(Default)]
pub struct FakeGateway {
    statuses: Mutex<HashMap<String, String>>,
    verifications: AtomicUsize,
    initialized: Mutex<Vec<i64>>,
}

impl FakeGateway {
    /// Script the status `verify` reports for a reference.
    pub fn set_status(&self, reference: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(reference.to_string(), status.to_string());
    }

    /// How many verifications were requested.
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    /// Amounts of every transaction initialized so far.
    pub fn initialized_amounts(&self) -> Vec<i64> {
        self.initialized.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize_transaction(
        &self,
        request: &InitializeTransaction,
    ) -> Result<Envelope<AuthorizationHandle>, PaymentError> {
        self.initialized.lock().unwrap().push(request.amount);
        Ok(Envelope {
            status: true,
            message: "Authorization URL created".into(),
            data: AuthorizationHandle {
                authorization_url: format!("https://checkout.test/{}", request.reference),
                access_code: "access_123".into(),
                reference: request.reference.clone(),
            },
        })
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, PaymentError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                status: 404,
                message: "Transaction reference not found".into(),
            })?;
        Ok(VerifiedTransaction::from_data(json!({
            "status": status,
            "reference": reference,
            "gateway_response": "Approved",
        })))
    }
}

/// Mailer that keeps every message.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    /// Messages sent so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Image host that hands out predictable URLs.
#[derive(Default)]
pub struct FakeImageHost {
    uploads: AtomicUsize,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image_base64: &str) -> Result<String, MediaError> {
        palmport_service::media::image_data_url(image_base64)?;
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://images.test/palmport_batches/{n}.png"))
    }
}

/// QR encoder that embeds the content length so tests can tell codes apart.
pub struct FakeQr;

#[async_trait]
impl QrEncoder for FakeQr {
    async fn encode_data_url(&self, content: &str) -> Result<String, MediaError> {
        Ok(format!("data:image/png;base64,{}", content.len()))
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for arranging and inspecting state.
    pub store: Arc<MemoryStore>,
    /// Scripted payment gateway.
    pub gateway: Arc<FakeGateway>,
    /// Every email the service sent.
    pub mailer: Arc<RecordingMailer>,
    /// A customer account.
    pub customer: Account,
    /// The admin account.
    pub admin: Account,
    keys: TokenKeys,
}

impl TestHarness {
    /// Create a harness with a fresh store, one customer and one admin.
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    /// Create a harness around a custom configuration.
    pub async fn with_config(config: ServiceConfig) -> Self {
        let config = ServiceConfig {
            admin_email: Some(ADMIN_EMAIL.into()),
            ..config
        };

        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let customer = seed_account(&store, "Ada Obi", "ada@example.com", Role::User).await;
        let admin = seed_account(&store, "Admin", ADMIN_EMAIL, Role::Admin).await;

        let integrations = Integrations {
            payments: Some(gateway.clone()),
            mailer: mailer.clone(),
            images: Some(Arc::new(FakeImageHost::default())),
            qr: Some(Arc::new(FakeQr)),
        };

        let keys = TokenKeys::from_secret(&config.jwt_secret);
        let state = AppState::with_integrations(store.clone(), config, integrations);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            gateway,
            mailer,
            customer,
            admin,
            keys,
        }
    }

    /// Authorization header for the customer.
    pub fn customer_auth(&self) -> String {
        self.bearer(&self.customer)
    }

    /// Authorization header for the admin.
    pub fn admin_auth(&self) -> String {
        self.bearer(&self.admin)
    }

    /// Authorization header for an arbitrary account.
    pub fn bearer(&self, account: &Account) -> String {
        format!("Bearer {}", self.keys.issue(account).expect("sign token"))
    }

    /// Wait for background mail matching `predicate`, returning all matches.
    pub async fn wait_for_mail(
        &self,
        predicate: impl Fn(&OutboundEmail) -> bool,
    ) -> Vec<OutboundEmail> {
        for _ in 0..200 {
            let matches: Vec<_> = self
                .mailer
                .sent()
                .into_iter()
                .filter(|m| predicate(m))
                .collect();
            if !matches.is_empty() {
                return matches;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected email was never sent: {:#?}", self.mailer.sent());
    }

    /// Let spawned side effects run, then return what was sent.
    pub async fn settle_mail(&self) -> Vec<OutboundEmail> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.mailer.sent()
    }
}

async fn seed_account(store: &MemoryStore, name: &str, email: &str, role: Role) -> Account {
    store
        .create_account(NewAccount {
            name: name.into(),
            email: email.into(),
            password_hash: hash_password(PASSWORD).expect("hash password"),
            role,
        })
        .await
        .expect("seed account")
}

/// A complete checkout body for the customer.
pub fn checkout_body(reference: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "customer_name": "Ada Obi",
        "email": "ada@example.com",
        "phone": "08031234567",
        "address": "12 Palm Avenue",
        "city": "Ikeja",
        "state": "Lagos",
        "items": [
            { "name": "Red Palm Oil", "size": "5L", "quantity": 2, "total": 9000 },
            { "name": "Palm Kernel Oil", "size": "1L", "quantity": 1, "total": 6500 }
        ],
        "subtotal": 15500,
        "shipping": 0,
        "total": 15500,
        "notes": "Call on arrival"
    });
    if let Some(reference) = reference {
        body["payment_reference"] = json!(reference);
    }
    body
}
