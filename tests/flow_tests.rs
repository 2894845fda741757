//! End-to-end flow tests: drive the student and psychologist state machines
//! with plain text and decoded callback actions against the in-memory store
//! and a recording gateway, then assert on both the records and the traffic.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use psych_support_bot::bot_state::BotState;
use psych_support_bot::config::Config;
use psych_support_bot::events::CallbackAction;
use psych_support_bot::flows::{psychologist, student};
use psych_support_bot::gateway::{Gateway, GatewayError, Outgoing};
use psych_support_bot::keyboards::{
    BTN_ANONYMOUS, BTN_BACK_TO_MENU, BTN_BOOK, BTN_CANCEL, BTN_CHAT, BTN_VIEW_MESSAGES,
};
use psych_support_bot::models::AppointmentStatus;
use psych_support_bot::sessions::OperatorState;
use psych_support_bot::store::{MemoryStore, Store};

const OPERATOR: i64 = 999;
const STUDENT: i64 = 42;

#[derive(Debug, Clone)]
struct SentMessage {
    chat_id: i64,
    text: String,
    reply_to: Option<i64>,
}

/// Records every send and hands out sequential external ids. `fail_next`
/// makes exactly one send fail, for delivery-failure scenarios.
struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    next_id: AtomicI64,
    fail_next: AtomicBool,
}

impl MockGateway {
    fn new() -> Self {
        MockGateway {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            fail_next: AtomicBool::new(false),
        }
    }

    fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    fn last_to(&self, chat_id: i64) -> SentMessage {
        self.sent_to(chat_id).pop().expect("no message sent")
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send(&self, chat_id: i64, outgoing: Outgoing) -> Result<i64, GatewayError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: outgoing.text,
            reply_to: outgoing.reply_to,
        });
        Ok(id)
    }

    async fn edit(
        &self,
        chat_id: i64,
        _message_id: i64,
        outgoing: Outgoing,
    ) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: outgoing.text,
            reply_to: outgoing.reply_to,
        });
        Ok(())
    }
}

fn test_app() -> BotState {
    let config = Config {
        psychologist_id: OPERATOR,
        database_url: String::new(),
    };
    BotState::new(Arc::new(MemoryStore::new()), config)
}

async fn student_says(app: &BotState, gw: &MockGateway, text: &str) {
    student_says_msg(app, gw, text, 1).await;
}

async fn student_says_msg(app: &BotState, gw: &MockGateway, text: &str, origin_id: i64) {
    student::handle_text(app, gw, STUDENT, Some("jane"), text, origin_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn booking_flow_creates_a_pending_appointment_and_notifies_once() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, Some("jane"))
        .await
        .unwrap();
    student_says(&app, &gw, BTN_BOOK).await;
    student_says(&app, &gw, "Jane Doe").await;
    student_says(&app, &gw, "S12345").await;
    // A bare weekday is always valid regardless of when the test runs.
    student_says(&app, &gw, "Monday").await;
    student_says(&app, &gw, "10:00").await;
    student_says(&app, &gw, "skip").await;

    let appointments = app.store.get_all_appointments().await.unwrap();
    assert_eq!(appointments.len(), 1);
    let apt = &appointments[0];
    assert_eq!(apt.status, AppointmentStatus::Pending);
    assert_eq!(apt.full_name, "Jane Doe");
    assert_eq!(apt.student_id, "S12345");
    assert_eq!(apt.preferred_date, "Monday");
    assert_eq!(apt.preferred_time, "10:00");
    assert_eq!(apt.reason, "Not specified");

    let to_operator = gw.sent_to(OPERATOR);
    assert_eq!(to_operator.len(), 1, "exactly one operator notification");
    assert!(to_operator[0].text.contains("New Appointment Request"));
    assert!(to_operator[0].text.contains("Jane Doe"));

    assert!(gw.last_to(STUDENT).text.contains("Appointment Request Sent"));
}

#[tokio::test]
async fn invalid_time_reprompts_without_advancing() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_BOOK).await;
    student_says(&app, &gw, "Jane Doe").await;
    student_says(&app, &gw, "S12345").await;
    student_says(&app, &gw, "Tuesday").await;

    // Lunch break: rejected, still at the time step.
    student_says(&app, &gw, "13:30").await;
    assert!(gw.last_to(STUDENT).text.contains("Lunch time"));
    assert!(app.store.get_all_appointments().await.unwrap().is_empty());

    // A valid retry continues the flow.
    student_says(&app, &gw, "14:00").await;
    assert!(gw.last_to(STUDENT).text.contains("Time slot is available"));
}

#[tokio::test]
async fn anonymous_chat_relays_raw_text_and_stores_anonymously() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, Some("jane"))
        .await
        .unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says_msg(&app, &gw, "I feel overwhelmed", 77).await;

    let stored = app.store.get_unreplied_messages().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_anonymous);
    assert_eq!(stored[0].message_text, "I feel overwhelmed");
    assert_eq!(stored[0].origin_message_id, 77);
    assert!(stored[0].forwarded_message_id.is_some());

    // The operator copy carries no identifying header.
    let to_operator = gw.sent_to(OPERATOR);
    assert_eq!(to_operator.len(), 1);
    assert_eq!(to_operator[0].text, "I feel overwhelmed");
    assert!(gw.last_to(STUDENT).text.contains("Message Sent"));

    // The chat session loops: a second message relays too.
    student_says_msg(&app, &gw, "still there?", 78).await;
    assert_eq!(app.store.get_unreplied_messages().await.unwrap().len(), 2);
}

#[tokio::test]
async fn reply_by_reference_threads_back_to_the_student() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, Some("jane"))
        .await
        .unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says_msg(&app, &gw, "I need advice", 55).await;

    let forwarded_id = app.store.get_unreplied_messages().await.unwrap()[0]
        .forwarded_message_id
        .unwrap();

    // The operator swipes-to-reply on the forwarded copy.
    psychologist::handle_text(&app, &gw, "Here is my advice", Some(forwarded_id))
        .await
        .unwrap();

    assert!(app.store.get_unreplied_messages().await.unwrap().is_empty());

    let threaded: Vec<_> = gw
        .sent_to(STUDENT)
        .into_iter()
        .filter(|m| m.reply_to == Some(55))
        .collect();
    assert_eq!(threaded.len(), 1);
    assert!(threaded[0].text.contains("Reply from the psychologist"));
    assert!(threaded[0].text.contains("Here is my advice"));

    assert!(gw.last_to(OPERATOR).text.contains("Reply sent successfully"));
}

#[tokio::test]
async fn second_reply_to_the_same_message_is_rejected() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says_msg(&app, &gw, "hello", 10).await;

    let message_id = {
        let msgs = app.store.get_unreplied_messages().await.unwrap();
        msgs[0].id
    };

    psychologist::handle_reply_command(&app, &gw, message_id)
        .await
        .unwrap();
    assert_eq!(app.operator_state().await, OperatorState::ReplyingTo(message_id));
    psychologist::handle_text(&app, &gw, "first reply", None)
        .await
        .unwrap();
    assert_eq!(app.operator_state().await, OperatorState::Idle);

    // A second attempt via /reply is turned away before the armed state.
    psychologist::handle_reply_command(&app, &gw, message_id)
        .await
        .unwrap();
    assert_eq!(app.operator_state().await, OperatorState::Idle);
    assert!(gw.last_to(OPERATOR).text.contains("already been replied"));

    let stored = app.store.get_message_by_id(message_id).await.unwrap().unwrap();
    assert_eq!(stored.operator_reply.as_deref(), Some("first reply"));
}

#[tokio::test]
async fn cancel_from_mid_flow_discards_the_draft() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_BOOK).await;
    student_says(&app, &gw, "Jane Doe").await;
    student_says(&app, &gw, BTN_CANCEL).await;

    assert!(app.store.get_all_appointments().await.unwrap().is_empty());
    assert!(gw.last_to(STUDENT).text.contains("Main Menu"));

    // The next flow starts from a clean draft: entering chat does not
    // inherit the abandoned name.
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says_msg(&app, &gw, "fresh start", 3).await;
    let stored = app.store.get_unreplied_messages().await.unwrap();
    assert!(stored[0].is_anonymous);
    assert_eq!(gw.sent_to(OPERATOR)[0].text, "fresh start");
}

#[tokio::test]
async fn back_to_menu_leaves_the_chat_session() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says(&app, &gw, BTN_BACK_TO_MENU).await;

    // Text after leaving is not relayed.
    student_says(&app, &gw, "this is not a chat message").await;
    assert!(app.store.get_unreplied_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_still_persists_the_message() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;

    gw.fail_next_send();
    student_says_msg(&app, &gw, "lost in transit", 9).await;

    let stored = app.store.get_unreplied_messages().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message_text, "lost in transit");
    assert!(stored[0].forwarded_message_id.is_none());
    assert!(gw.last_to(STUDENT).text.contains("could not be delivered"));
    assert!(gw.sent_to(OPERATOR).is_empty());
}

#[tokio::test]
async fn confirming_an_appointment_notifies_the_student_once() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_BOOK).await;
    student_says(&app, &gw, "Jane Doe").await;
    student_says(&app, &gw, "S12345").await;
    student_says(&app, &gw, "Monday").await;
    student_says(&app, &gw, "11:00").await;
    student_says(&app, &gw, "exam stress").await;

    let apt_id = app.store.get_all_appointments().await.unwrap()[0].id;
    let student_msgs_before = gw.sent_to(STUDENT).len();

    psychologist::handle_action(&app, &gw, 500, CallbackAction::ConfirmAppointment(apt_id))
        .await
        .unwrap();

    let apt = app.store.get_appointment_by_id(apt_id).await.unwrap().unwrap();
    assert_eq!(apt.status, AppointmentStatus::Confirmed);

    let mut all_to_student = gw.sent_to(STUDENT);
    let new_to_student = all_to_student.split_off(student_msgs_before);
    assert_eq!(new_to_student.len(), 1);
    assert!(new_to_student[0].text.contains("Appointment Confirmed"));

    // The guard blocks a second transition, and no further notification goes
    // out.
    psychologist::handle_action(&app, &gw, 500, CallbackAction::CancelAppointment(apt_id))
        .await
        .unwrap();
    let apt = app.store.get_appointment_by_id(apt_id).await.unwrap().unwrap();
    assert_eq!(apt.status, AppointmentStatus::Confirmed);
    assert_eq!(gw.sent_to(STUDENT).len(), student_msgs_before + 1);
}

#[tokio::test]
async fn operator_menu_lists_unreplied_messages() {
    let app = test_app();
    let gw = MockGateway::new();

    student::handle_start(&app, &gw, STUDENT, None).await.unwrap();
    student_says(&app, &gw, BTN_CHAT).await;
    student_says(&app, &gw, BTN_ANONYMOUS).await;
    student_says_msg(&app, &gw, "first", 1).await;
    student_says_msg(&app, &gw, "second", 2).await;

    psychologist::handle_text(&app, &gw, BTN_VIEW_MESSAGES, None)
        .await
        .unwrap();
    assert!(gw.last_to(OPERATOR).text.contains("Unreplied Messages (2)"));
    assert_eq!(app.operator_state().await, OperatorState::ViewingMessages);
}

#[tokio::test]
async fn stray_text_without_a_session_offers_the_menu() {
    let app = test_app();
    let gw = MockGateway::new();

    // No /start first.
    student_says(&app, &gw, "hello?").await;
    assert!(gw.last_to(STUDENT).text.contains("Main Menu"));

    // The user now exists in the store.
    let user = app
        .store
        .get_or_create_user(STUDENT, Some("jane"))
        .await
        .unwrap();
    assert_eq!(user.telegram_id, STUDENT);
}
