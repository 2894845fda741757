//! Student-side conversation flow.
//!
//! A strict linear-with-cancel graph: every "enter field" step captures one
//! value, nothing navigates backwards, and `❌ Cancel` / `🔙 Back to Menu`
//! drop the whole draft from any step. Cross-field validation happens only
//! at the time step, where date and time are checked together.

use chrono::Local;
use teloxide::utils::html;

use crate::bot_state::BotState;
use crate::error::BotError;
use crate::gateway::{Gateway, Outgoing};
use crate::keyboards::{
    self, BTN_ABOUT, BTN_ANONYMOUS, BTN_BACK_TO_MENU, BTN_BOOK, BTN_CANCEL, BTN_CHAT,
    BTN_ENTER_NEW, BTN_IDENTIFIED, BTN_USE_SAVED,
};
use crate::relay::{self, ForwardOutcome};
use crate::sessions::{Session, StudentState};
use crate::validators::{self, validate_appointment_time};
use crate::{notifications, sessions};

const WELCOME: &str = "🎓 <b>Welcome to University Psychology Support</b>\n\n\
    I'm here to help you connect with our university psychologist.\n\n\
    You can:\n\
    📅 <b>Book an Appointment</b> - Schedule a face-to-face session\n\
    💬 <b>Online Chat</b> - Send a message to the psychologist\n\n\
    All conversations are confidential and professional.\n\n\
    How would you like to proceed?";

const ABOUT: &str = "ℹ️ <b>About This Service</b>\n\n\
    This bot connects university students with our professional psychologist.\n\n\
    <b>Services Available:</b>\n\
    • Anonymous or identified online counseling\n\
    • Appointment booking for face-to-face sessions\n\
    • Confidential and professional support\n\n\
    <b>Privacy:</b>\n\
    All communications are confidential. When using anonymous chat, \
    your identity is protected.\n\n\
    <b>Response Time:</b>\n\
    The psychologist typically responds within 24 hours during working days.";

const CHAT_SESSION_HINT: &str = "Type your messages below - each one is sent straight \
    to the psychologist. Press 🔙 Back to Menu when you are done.";

pub async fn handle_start(
    app: &BotState,
    gw: &dyn Gateway,
    chat_id: i64,
    username: Option<&str>,
) -> Result<(), BotError> {
    app.store.get_or_create_user(chat_id, username).await?;
    gw.send(
        chat_id,
        Outgoing::text(WELCOME).with_markup(keyboards::main_menu()),
    )
    .await?;
    app.sessions
        .reset_to(chat_id, StudentState::ChoosingService)
        .await;
    Ok(())
}

/// `/menu`, cancel and back-to-menu all land here: discard the draft and
/// return to the initial step.
pub async fn handle_menu(app: &BotState, gw: &dyn Gateway, chat_id: i64) -> Result<(), BotError> {
    gw.send(
        chat_id,
        Outgoing::text("Main Menu - Choose an option:").with_markup(keyboards::main_menu()),
    )
    .await?;
    app.sessions
        .reset_to(chat_id, StudentState::ChoosingService)
        .await;
    Ok(())
}

pub async fn handle_text(
    app: &BotState,
    gw: &dyn Gateway,
    chat_id: i64,
    username: Option<&str>,
    text: &str,
    origin_message_id: i64,
) -> Result<(), BotError> {
    // Cancel is honored from every state, before anything else looks at
    // the input.
    if text == BTN_CANCEL || text == BTN_BACK_TO_MENU {
        return handle_menu(app, gw, chat_id).await;
    }

    let Some(mut session) = app.sessions.get(chat_id).await else {
        // No active dialog: register the user lazily and offer the menu
        // instead of dropping the input on the floor.
        app.store.get_or_create_user(chat_id, username).await?;
        return handle_menu(app, gw, chat_id).await;
    };

    match session.state {
        StudentState::ChoosingService => match text {
            BTN_CHAT => {
                gw.send(
                    chat_id,
                    Outgoing::text(
                        "💬 <b>Online Chat</b>\n\n\
                         You can choose to send your messages:\n\n\
                         🎭 <b>Anonymous Chat</b> - Your identity remains private\n\
                         👤 <b>Share My Information</b> - Include your name and student ID\n\n\
                         How would you like to proceed?",
                    )
                    .with_markup(keyboards::chat_type_menu()),
                )
                .await?;
                session.state = StudentState::ChoosingChatType;
            }
            BTN_BOOK => {
                gw.send(
                    chat_id,
                    Outgoing::text(
                        "📅 <b>Book an Appointment</b>\n\n\
                         Let's schedule your appointment with the psychologist.\n\n\
                         Please enter your <b>full name</b>:",
                    )
                    .with_markup(keyboards::cancel_menu()),
                )
                .await?;
                session.state = StudentState::EnteringAppointmentFullName;
            }
            BTN_ABOUT => {
                gw.send(chat_id, Outgoing::text(ABOUT)).await?;
            }
            _ => {
                gw.send(
                    chat_id,
                    Outgoing::text("Please use the menu buttons below.")
                        .with_markup(keyboards::main_menu()),
                )
                .await?;
            }
        },

        StudentState::ChoosingChatType => match text {
            BTN_ANONYMOUS => {
                session.draft.is_anonymous = Some(true);
                gw.send(
                    chat_id,
                    Outgoing::text(format!(
                        "🎭 <b>Anonymous Chat</b>\n\n\
                         Your messages will be sent anonymously to the psychologist.\n\n\
                         {CHAT_SESSION_HINT}"
                    ))
                    .with_markup(keyboards::chat_session_menu()),
                )
                .await?;
                session.state = StudentState::InChatSession;
            }
            BTN_IDENTIFIED => {
                session.draft.is_anonymous = Some(false);
                let user = app.store.get_or_create_user(chat_id, username).await?;
                if user.has_saved_details() {
                    let name = user.full_name.as_deref().unwrap_or("N/A");
                    let student_id = user.student_id.as_deref().unwrap_or("not set");
                    gw.send(
                        chat_id,
                        Outgoing::text(format!(
                            "👤 <b>Share Information</b>\n\n\
                             I still have your details from last time:\n\
                             • Name: {}\n\
                             • Student ID: {}\n\n\
                             Use them again, or enter new ones?",
                            html::escape(name),
                            html::escape(student_id)
                        ))
                        .with_markup(keyboards::credentials_menu()),
                    )
                    .await?;
                    session.state = StudentState::ChoosingCredentials;
                } else {
                    gw.send(
                        chat_id,
                        Outgoing::text(
                            "👤 <b>Share Information</b>\n\n\
                             Please enter your <b>full name</b>:",
                        )
                        .with_markup(keyboards::cancel_menu()),
                    )
                    .await?;
                    session.state = StudentState::EnteringFullName;
                }
            }
            _ => {
                gw.send(
                    chat_id,
                    Outgoing::text("Please use the menu buttons below.")
                        .with_markup(keyboards::chat_type_menu()),
                )
                .await?;
            }
        },

        StudentState::ChoosingCredentials => match text {
            BTN_USE_SAVED => {
                let user = app.store.get_or_create_user(chat_id, username).await?;
                session.draft.full_name = user.full_name;
                session.draft.student_id = user.student_id;
                gw.send(
                    chat_id,
                    Outgoing::text(format!(
                        "Thank you!\n\n{CHAT_SESSION_HINT}"
                    ))
                    .with_markup(keyboards::chat_session_menu()),
                )
                .await?;
                session.state = StudentState::InChatSession;
            }
            BTN_ENTER_NEW => {
                gw.send(
                    chat_id,
                    Outgoing::text("Please enter your <b>full name</b>:")
                        .with_markup(keyboards::cancel_menu()),
                )
                .await?;
                session.state = StudentState::EnteringFullName;
            }
            _ => {
                gw.send(
                    chat_id,
                    Outgoing::text("Please use the menu buttons below.")
                        .with_markup(keyboards::credentials_menu()),
                )
                .await?;
            }
        },

        StudentState::EnteringFullName => {
            session.draft.full_name = Some(text.to_string());
            gw.send(
                chat_id,
                Outgoing::text(
                    "Please enter your <b>student ID</b> (optional):\n\n\
                     Type 'skip' if you are staff or prefer not to share.",
                )
                .with_markup(keyboards::cancel_menu()),
            )
            .await?;
            session.state = StudentState::EnteringStudentId;
        }

        StudentState::EnteringStudentId => {
            let student_id = if text.eq_ignore_ascii_case("skip") {
                None
            } else {
                Some(text.to_string())
            };
            session.draft.student_id = student_id.clone();
            let full_name = session.draft.full_name.clone().unwrap_or_default();
            app.store
                .update_user_info(chat_id, &full_name, student_id.as_deref())
                .await?;
            gw.send(
                chat_id,
                Outgoing::text(format!(
                    "Thank you, {}!\n\n{CHAT_SESSION_HINT}",
                    html::escape(&full_name)
                ))
                .with_markup(keyboards::chat_session_menu()),
            )
            .await?;
            session.state = StudentState::InChatSession;
        }

        StudentState::InChatSession => {
            let outcome = relay::forward_to_operator(
                app.store.as_ref(),
                gw,
                app.operator_id(),
                chat_id,
                &session.draft,
                text,
                origin_message_id,
            )
            .await?;
            let confirmation = match outcome {
                ForwardOutcome::Delivered(_) => {
                    "✅ <b>Message Sent!</b>\n\n\
                     You will receive a response when the psychologist replies."
                }
                ForwardOutcome::SavedNotDelivered(_) => {
                    "⚠️ Your message was saved but could not be delivered to the \
                     psychologist right now. It will be visible in their inbox."
                }
            };
            gw.send(
                chat_id,
                Outgoing::text(confirmation).with_markup(keyboards::chat_session_menu()),
            )
            .await?;
            // State intentionally unchanged: the chat session is a loop.
        }

        StudentState::EnteringAppointmentFullName => {
            session.draft.full_name = Some(text.to_string());
            gw.send(
                chat_id,
                Outgoing::text("Please enter your <b>student ID</b>:")
                    .with_markup(keyboards::cancel_menu()),
            )
            .await?;
            session.state = StudentState::EnteringAppointmentStudentId;
        }

        StudentState::EnteringAppointmentStudentId => {
            session.draft.student_id = Some(text.to_string());
            gw.send(
                chat_id,
                Outgoing::text(format!(
                    "{}\n\n\
                     Please enter your <b>preferred date</b>\n\
                     Examples: Monday, 15.10.2025, 15/10/2025",
                    validators::working_hours_text()
                ))
                .with_markup(keyboards::cancel_menu()),
            )
            .await?;
            session.state = StudentState::EnteringPreferredDate;
        }

        StudentState::EnteringPreferredDate => {
            session.draft.preferred_date = Some(text.to_string());
            gw.send(
                chat_id,
                Outgoing::text(
                    "Please enter your <b>preferred time</b> (e.g., 10:00 AM or 14:00):",
                )
                .with_markup(keyboards::cancel_menu()),
            )
            .await?;
            session.state = StudentState::EnteringPreferredTime;
        }

        StudentState::EnteringPreferredTime => {
            let date = session.draft.preferred_date.clone().unwrap_or_default();
            match validate_appointment_time(&date, text, Local::now().naive_local()) {
                // Re-entrant on failure: re-prompt without advancing.
                Err(reason) => {
                    gw.send(
                        chat_id,
                        Outgoing::text(format!(
                            "{reason}\n\nPlease enter a valid time (e.g., 10:00, 14:30, 2:00 PM):"
                        ))
                        .with_markup(keyboards::cancel_menu()),
                    )
                    .await?;
                }
                Ok(()) => {
                    session.draft.preferred_time = Some(text.to_string());
                    gw.send(
                        chat_id,
                        Outgoing::text(
                            "✅ Time slot is available!\n\n\
                             Please briefly describe the <b>reason for your appointment</b> \
                             (optional):\n\n\
                             Or type 'skip' to skip this step.",
                        )
                        .with_markup(keyboards::cancel_menu()),
                    )
                    .await?;
                    session.state = StudentState::EnteringReason;
                }
            }
        }

        StudentState::EnteringReason => {
            let reason = if text.eq_ignore_ascii_case("skip") {
                "Not specified".to_string()
            } else {
                text.to_string()
            };
            submit_appointment(app, gw, chat_id, &session, &reason).await?;
            session = Session::new(StudentState::ChoosingService);
        }
    }

    app.sessions.set(chat_id, session).await;
    Ok(())
}

async fn submit_appointment(
    app: &BotState,
    gw: &dyn Gateway,
    chat_id: i64,
    session: &sessions::Session,
    reason: &str,
) -> Result<(), BotError> {
    let draft = &session.draft;
    let appointment = app
        .store
        .create_appointment(
            chat_id,
            draft.full_name.as_deref().unwrap_or_default(),
            draft.student_id.as_deref().unwrap_or_default(),
            draft.preferred_date.as_deref().unwrap_or_default(),
            draft.preferred_time.as_deref().unwrap_or_default(),
            reason,
        )
        .await?;

    notifications::notify_new_appointment(gw, app.operator_id(), &appointment).await;

    gw.send(
        chat_id,
        Outgoing::text(format!(
            "✅ <b>Appointment Request Sent!</b>\n\n\
             📆 Date: {}\n\
             🕐 Time: {}\n\n\
             The psychologist will review your request and confirm the appointment.\n\
             You will be notified once it's confirmed.",
            html::escape(&appointment.preferred_date),
            html::escape(&appointment.preferred_time),
        ))
        .with_markup(keyboards::main_menu()),
    )
    .await?;
    Ok(())
}
