// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transports recording every send and failing on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cadence_core::traits::transport::{
    CallTransport, EmailMessage, EmailTransport, LinkedinSendOutcome, LinkedinTransport,
};
use cadence_core::CadenceError;
use secrecy::SecretString;

/// Failure kinds a mock can be scripted to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Transient,
    Auth,
    Permanent,
    RateLimited,
}

impl MockFailure {
    fn to_error(self) -> CadenceError {
        match self {
            MockFailure::Transient => CadenceError::Transport {
                message: "simulated timeout".to_string(),
                source: None,
            },
            MockFailure::Auth => CadenceError::Auth("simulated bad credentials".to_string()),
            MockFailure::Permanent => {
                CadenceError::PermanentDelivery("simulated hard bounce".to_string())
            }
            MockFailure::RateLimited => CadenceError::RateLimited("simulated 429".to_string()),
        }
    }
}

/// Shared failure script: each queued entry fails one call.
#[derive(Default)]
struct FailureScript {
    queued: Mutex<Vec<MockFailure>>,
}

impl FailureScript {
    fn push(&self, failure: MockFailure, times: usize) {
        let mut queued = self.queued.lock().unwrap();
        for _ in 0..times {
            queued.push(failure);
        }
    }

    fn next(&self) -> Option<MockFailure> {
        let mut queued = self.queued.lock().unwrap();
        if queued.is_empty() {
            None
        } else {
            Some(queued.remove(0))
        }
    }
}

/// Recording email transport.
#[derive(Default)]
pub struct MockEmailTransport {
    pub sent: Mutex<Vec<EmailMessage>>,
    failures: FailureScript,
    counter: AtomicU64,
}

impl MockEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `times` sends to fail with `failure`.
    pub fn fail_next(&self, failure: MockFailure, times: usize) {
        self.failures.push(failure, times);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailTransport for MockEmailTransport {
    async fn send(
        &self,
        _account_email: &str,
        _password: &SecretString,
        _provider: &str,
        message: &EmailMessage,
    ) -> Result<String, CadenceError> {
        if let Some(failure) = self.failures.next() {
            return Err(failure.to_error());
        }
        self.sent.lock().unwrap().push(message.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("<mock-email-{n}@test>"))
    }
}

/// Recording call transport.
#[derive(Default)]
pub struct MockCallTransport {
    pub calls: Mutex<Vec<(String, String)>>,
    failures: FailureScript,
    counter: AtomicU64,
}

impl MockCallTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, failure: MockFailure, times: usize) {
        self.failures.push(failure, times);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CallTransport for MockCallTransport {
    async fn start_call(
        &self,
        phone_number: &str,
        script: &str,
        _api_key: &SecretString,
    ) -> Result<String, CadenceError> {
        if let Some(failure) = self.failures.next() {
            return Err(failure.to_error());
        }
        self.calls
            .lock()
            .unwrap()
            .push((phone_number.to_string(), script.to_string()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock-call-{n}"))
    }
}

/// Recording LinkedIn transport.
#[derive(Default)]
pub struct MockLinkedinTransport {
    /// `(action, attendee_id, text)` per send.
    pub sent: Mutex<Vec<(String, String, String)>>,
    failures: FailureScript,
    counter: AtomicU64,
}

impl MockLinkedinTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, failure: MockFailure, times: usize) {
        self.failures.push(failure, times);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl LinkedinTransport for MockLinkedinTransport {
    async fn send_message(
        &self,
        _account_id: &str,
        attendee_id: &str,
        chat_id: Option<&str>,
        text: &str,
        inmail: bool,
    ) -> Result<LinkedinSendOutcome, CadenceError> {
        if let Some(failure) = self.failures.next() {
            return Err(failure.to_error());
        }
        let action = if inmail { "inmail" } else { "message" };
        self.sent
            .lock()
            .unwrap()
            .push((action.to_string(), attendee_id.to_string(), text.to_string()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(LinkedinSendOutcome {
            provider_message_id: format!("mock-lm-{n}"),
            chat_id: chat_id.map(str::to_string).or(Some(format!("mock-chat-{n}"))),
        })
    }

    async fn send_invitation(
        &self,
        _account_id: &str,
        attendee_id: &str,
        message: &str,
    ) -> Result<LinkedinSendOutcome, CadenceError> {
        if let Some(failure) = self.failures.next() {
            return Err(failure.to_error());
        }
        self.sent.lock().unwrap().push((
            "invitation".to_string(),
            attendee_id.to_string(),
            message.to_string(),
        ));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(LinkedinSendOutcome {
            provider_message_id: format!("mock-inv-{n}"),
            chat_id: None,
        })
    }
}
