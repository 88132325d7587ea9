use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use futures_util::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod actions;
mod api;
mod chart;
mod config;
mod error;
mod markdown;
mod session;
mod settings;

use actions::ReplyAction;
use api::{ApiClient, ChatRequest, UploadFile};
use config::{AppConfig, AVAILABLE_MODELS};
use session::{NamedFile, Role, Session, TranscriptEntry};
use settings::{Settings, SettingsStore};

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sheetchat=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting SheetChat");
    dioxus::launch(App);
}

/* ================= BROWSER HELPERS ================= */

fn js_string(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

fn show_alert(message: &str) {
    let _ = document::eval(&format!("alert({});", js_string(message)));
}

fn copy_to_clipboard(text: &str) {
    let _ = document::eval(&format!("navigator.clipboard.writeText({});", js_string(text)));
}

async fn scroll_to_bottom(element_id: &'static str) {
    let _ = document::eval(&format!(
        "const el = document.getElementById('{element_id}'); if (el) {{ el.scrollTop = el.scrollHeight; }}"
    ))
    .await;
}

impl NamedFile for FileData {
    fn file_name(&self) -> String {
        self.name()
    }
}

fn load_model(config: &AppConfig) -> String {
    match SettingsStore::open(&config.db_path).and_then(|store| store.load(&config.default_model)) {
        Ok(settings) => settings.model,
        Err(e) => {
            warn!(error = %e, "could not load preferences, using default model");
            config.default_model.clone()
        }
    }
}

fn save_model(config: &AppConfig, model: &str) {
    let saved = SettingsStore::open(&config.db_path).and_then(|store| {
        store.save(&Settings {
            model: model.to_string(),
        })
    });
    if let Err(e) = saved {
        warn!(error = %e, "could not persist model selection");
    }
}

/* ================= ACTIONS ================= */

/// Filters, reads and posts a batch of picked or dropped files.
async fn upload_files(mut session: Signal<Session>, api: ApiClient, files: Vec<FileData>) {
    let Some(accepted) = session.write().prepare_upload(files) else {
        return;
    };

    let reads = join_all(accepted.into_iter().map(|file| async move {
        let name = file.name();
        match file.read_bytes().await {
            Ok(bytes) => Ok(UploadFile {
                name,
                bytes: bytes.to_vec(),
            }),
            Err(e) => Err(format!("Could not read {name}: {e}")),
        }
    }))
    .await;

    let mut batch = Vec::with_capacity(reads.len());
    for read in reads {
        match read {
            Ok(file) => batch.push(file),
            Err(message) => session.write().log.push(message),
        }
    }
    if !session.write().begin_upload(&batch) {
        return;
    }

    let result = api.upload(batch).await;
    session.write().finish_upload(result);
}

async fn chat_round_trip(mut session: Signal<Session>, api: ApiClient, request: ChatRequest) {
    let result = api.chat(&request).await;
    session.write().finish_chat(result);
}

async fn reset_session(mut session: Signal<Session>, api: ApiClient) {
    let result = api.reset().await;
    session.write().finish_reset(result);
}

/* ================= APP ================= */

#[component]
fn App() -> Element {
    let config = use_hook(AppConfig::from_env);
    let client = use_hook({
        let url = config.server_url.clone();
        move || {
            ApiClient::new(url).map_err(|e| {
                error!(error = %e, "could not build HTTP client");
                e.to_string()
            })
        }
    });

    match client {
        Ok(api) => rsx! {
            document::Link { rel: "stylesheet", href: MAIN_CSS }
            Workspace { api, config }
        },
        Err(message) => rsx! {
            document::Link { rel: "stylesheet", href: MAIN_CSS }
            div { class: "startup-error", "Could not start SheetChat: {message}" }
        },
    }
}

#[component]
fn Workspace(api: ApiClient, config: AppConfig) -> Element {
    let session = use_signal(Session::new);
    let api = use_signal(move || api);
    let model = use_signal({
        let config = config.clone();
        move || load_model(&config)
    });
    let api_key = use_signal(String::new);

    rsx! {
        div { class: "app-container",
            Header { session, api, model, api_key, config: config.clone() }

            div { class: "main-area",
                div { class: "sidebar",
                    UploadPanel { session, api }
                    Catalog { session }
                }
                ChatWindow { session, api, model, api_key }
                ActivityPanel { session }
            }
        }
    }
}

/* ================= HEADER ================= */

#[component]
fn Header(
    session: Signal<Session>,
    api: Signal<ApiClient>,
    mut model: Signal<String>,
    mut api_key: Signal<String>,
    config: AppConfig,
) -> Element {
    // persisted model may no longer be in the list; keep it selectable
    let options_vec = {
        let mut v: Vec<String> = AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect();
        let selected = model();
        if !selected.is_empty() && !v.contains(&selected) {
            v.insert(0, selected);
        }
        v
    };

    rsx! {
        div { class: "header",
            h1 { class: "logo", "SheetChat" }

            div { class: "header-controls",
                input {
                    class: "input api-key",
                    r#type: "password",
                    placeholder: "Gemini API Key",
                    value: "{api_key}",
                    oninput: move |e| api_key.set(e.value()),
                }

                select {
                    class: "input",
                    value: "{model}",
                    onchange: move |e| {
                        let chosen = e.value();
                        save_model(&config, &chosen);
                        model.set(chosen);
                    },
                    {options_vec.iter().map(|m| rsx!( option { selected: (m == &model()), value: "{m}", "{m}" } ))}
                }

                button {
                    class: "reset-btn",
                    onclick: move |_| {
                        spawn(reset_session(session, api()));
                    },
                    "New session"
                }
            }
        }
    }
}

/* ================= UPLOAD ================= */

#[component]
fn UploadPanel(session: Signal<Session>, api: Signal<ApiClient>) -> Element {
    let mut dragging = use_signal(|| false);

    rsx! {
        div {
            class: if dragging() { "drop-zone dragover" } else { "drop-zone" },
            ondragover: move |e: DragEvent| {
                e.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| dragging.set(false),
            ondrop: move |e: DragEvent| {
                e.prevent_default();
                dragging.set(false);
                spawn(upload_files(session, api(), e.files()));
            },

            p { "Drag & drop .xlsx files here" }
            p { class: "dim-text", "or" }
            label { class: "browse-btn", r#for: "file-input", "Browse files" }
            input {
                id: "file-input",
                class: "hidden",
                r#type: "file",
                accept: ".xlsx",
                multiple: true,
                onchange: move |e: FormEvent| {
                    spawn(upload_files(session, api(), e.files()));
                },
            }
        }
    }
}

#[component]
fn Catalog(session: Signal<Session>) -> Element {
    rsx! {
        div { class: "file-catalog",
            h3 { "Files" }
            if session.read().catalog().is_empty() {
                p { class: "dim-text", "No files uploaded yet." }
            }
            {session.read().catalog().iter().enumerate().map(|(i, item)| {
                let key = item.row_key(i);
                rsx! {
                    div { class: "file-item", key: "{key}",
                        div { class: "file-name", "{item.filename}" }
                        div { class: "file-summary", "{item.summary}" }
                    }
                }
            })}
        }
    }
}

/* ================= CHAT WINDOW ================= */

#[component]
fn ChatWindow(
    mut session: Signal<Session>,
    api: Signal<ApiClient>,
    model: Signal<String>,
    api_key: Signal<String>,
) -> Element {
    let mut input_text = use_signal(String::new);

    use_effect(move || {
        let _ = session.read().transcript().len();
        spawn(scroll_to_bottom("chat-history"));
    });

    let mut submit = move || {
        let begun = session.write().begin_chat(&input_text(), &api_key(), &model());
        match begun {
            Ok(request) => {
                input_text.set(String::new());
                spawn(chat_round_trip(session, api(), request));
            }
            Err(rejection) => {
                if let Some(message) = rejection.alert() {
                    show_alert(message);
                }
            }
        }
    };

    rsx! {
        div { class: "chat-window",
            div { id: "chat-history", class: "chat-messages",
                {session.read().transcript().iter().map(|entry| rsx! {
                    Message { key: "{entry.id}", session, entry: entry.clone() }
                })}

                if session.read().is_sending() {
                    div { class: "message model loading-message",
                        p { "Thinking..." }
                        div { class: "loading-dots" }
                    }
                }
            }

            div { class: "chat-input-area",
                textarea {
                    class: "chat-input",
                    placeholder: "Ask about your spreadsheets...",
                    value: "{input_text}",
                    oninput: move |e| input_text.set(e.value()),
                    onkeydown: move |e: KeyboardEvent| {
                        if e.key() == Key::Enter && !e.modifiers().contains(Modifiers::SHIFT) {
                            e.prevent_default();
                            submit();
                        }
                    },
                }

                button {
                    class: "send-button",
                    disabled: session.read().is_sending(),
                    onclick: move |_| submit(),
                    "➤ Send"
                }
            }
        }
    }
}

/* ================= MESSAGE ================= */

#[component]
fn Message(session: Signal<Session>, entry: TranscriptEntry) -> Element {
    let content = entry.turn.content.clone();

    match entry.turn.role {
        Role::Model => {
            let html = markdown::to_safe_html(&content);
            rsx! {
                div { class: "message model",
                    div { class: "content", dangerous_inner_html: "{html}" }
                    ActionBar { session, reply: content }
                }
                if let Some(chart) = entry.chart {
                    div { class: "message model",
                        div { class: "chart-container", title: "{chart.title}", dangerous_inner_html: "{chart.svg}" }
                    }
                }
            }
        }
        Role::User => rsx! {
            div { class: "message user",
                div { class: "content", "{content}" }
            }
        },
        Role::System => rsx! {
            div { class: "message system",
                div { class: "content", "{content}" }
            }
        },
    }
}

#[component]
fn ActionBar(mut session: Signal<Session>, reply: String) -> Element {
    rsx! {
        div { class: "action-bar",
            {ReplyAction::ALL.into_iter().map(|action| {
                let reply = reply.clone();
                let name = action.name();
                rsx! {
                    button {
                        key: "{name}",
                        class: "action-btn",
                        title: name,
                        dangerous_inner_html: action.icon(),
                        onclick: move |_| {
                            let effect = action.effect(&reply);
                            if let Some(text) = &effect.clipboard {
                                copy_to_clipboard(text);
                            }
                            if let Some(message) = &effect.alert {
                                show_alert(message);
                            }
                            session.write().log.push(effect.log);
                        },
                    }
                }
            })}
        }
    }
}

/* ================= ACTIVITY LOG ================= */

#[component]
fn ActivityPanel(mut session: Signal<Session>) -> Element {
    use_effect(move || {
        let _ = session.read().log.entries().len();
        spawn(scroll_to_bottom("log-content"));
    });

    rsx! {
        div { class: "log-panel",
            div { class: "log-header",
                h3 { "Activity" }
                button { class: "clear-log", onclick: move |_| session.write().log.clear(), "Clear" }
            }
            div { id: "log-content", class: "log-content",
                {session.read().log.entries().iter().enumerate().map(|(i, entry)| rsx! {
                    div { class: "log-entry", key: "{i}",
                        span { class: "timestamp", "[{entry.timestamp}]" }
                        " {entry.message}"
                    }
                })}
            }
        }
    }
}
