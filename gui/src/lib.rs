use chrono::{DateTime, Local, Utc};
use iced::widget::{button, column, container, row, text, text_input, toggler, Column, Space};
use iced::{Color, Command, Element, Length, Subscription, Theme};
use reeltube_core::{AppConfig, ErrorExt, RunState, Settings, Toggle};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub mod controller;
pub mod wizard;

pub use controller::{bootstrap, AppController, DashboardSnapshot};
pub use wizard::{normalize_account, SetupWizard, WizardOutcome, WizardStep};

pub const APP_TITLE: &str = "Reel to Tube Automator";

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const ERROR_COLOR: Color = Color::from_rgb(0.8, 0.2, 0.2);
const RUNNING_COLOR: Color = Color::from_rgb(0.2, 0.6, 0.3);
const MUTED_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.5);

/// Controller shared between the view and in-flight commands.
#[derive(Clone)]
pub struct SharedController(Arc<Mutex<AppController>>);

impl SharedController {
    pub fn new(controller: AppController) -> Self {
        Self(Arc::new(Mutex::new(controller)))
    }
}

impl fmt::Debug for SharedController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedController")
    }
}

/// Controller operations triggered from the UI.
#[derive(Debug, Clone)]
pub enum Action {
    CompleteSetup(Settings),
    Start,
    Stop,
    SetToggle(Toggle, bool),
    Reset,
    Refresh,
}

impl Action {
    fn notice(&self) -> Option<&'static str> {
        match self {
            Action::CompleteSetup(_) => Some("Setup complete!"),
            Action::Start => Some("Automation started"),
            Action::Stop => Some("Automation stopped"),
            Action::SetToggle(..) => Some("Settings updated"),
            Action::Reset => Some("Automation reset"),
            Action::Refresh => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Loaded(Result<SharedController, String>),
    AccountChanged(String),
    TitleTemplateChanged(String),
    DescriptionTemplateChanged(String),
    WizardToggled(Toggle, bool),
    WizardNext,
    WizardBack,
    Start,
    Stop,
    ToggleChanged(Toggle, bool),
    Reset,
    Refresh,
    Applied {
        notice: Option<&'static str>,
        result: Result<DashboardSnapshot, String>,
    },
}

pub enum Screen {
    Loading,
    Failed(String),
    Wizard(SetupWizard),
    Dashboard(DashboardSnapshot),
}

pub struct App {
    controller: Option<SharedController>,
    screen: Screen,
    notice: Option<String>,
}

impl App {
    pub fn new(config: AppConfig) -> (Self, Command<Message>) {
        let app = Self {
            controller: None,
            screen: Screen::Loading,
            notice: None,
        };
        (app, Command::perform(load(config), Message::Loaded))
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::Loaded(Ok(controller)) => {
                info!("Controller ready");
                self.controller = Some(controller);
                self.dispatch(Action::Refresh)
            }
            Message::Loaded(Err(e)) => {
                self.screen = Screen::Failed(e);
                Command::none()
            }
            Message::AccountChanged(value) => {
                if let Screen::Wizard(wizard) = &mut self.screen {
                    wizard.set_account(value);
                }
                Command::none()
            }
            Message::TitleTemplateChanged(value) => {
                if let Screen::Wizard(wizard) = &mut self.screen {
                    wizard.set_title_template(value);
                }
                Command::none()
            }
            Message::DescriptionTemplateChanged(value) => {
                if let Screen::Wizard(wizard) = &mut self.screen {
                    wizard.set_description_template(value);
                }
                Command::none()
            }
            Message::WizardToggled(toggle, enabled) => {
                if let Screen::Wizard(wizard) = &mut self.screen {
                    wizard.set_toggle(toggle, enabled);
                }
                Command::none()
            }
            Message::WizardNext => {
                let Screen::Wizard(wizard) = &mut self.screen else {
                    return Command::none();
                };
                match wizard.next() {
                    Ok(WizardOutcome::Advanced(step)) => {
                        debug!("Wizard at step {}", step.number());
                        Command::none()
                    }
                    Ok(WizardOutcome::Completed(settings)) => {
                        self.dispatch(Action::CompleteSetup(settings))
                    }
                    Err(e) => {
                        e.log_warn();
                        Command::none()
                    }
                }
            }
            Message::WizardBack => {
                if let Screen::Wizard(wizard) = &mut self.screen {
                    wizard.back();
                }
                Command::none()
            }
            Message::Start => self.dispatch(Action::Start),
            Message::Stop => self.dispatch(Action::Stop),
            Message::ToggleChanged(toggle, enabled) => {
                self.dispatch(Action::SetToggle(toggle, enabled))
            }
            Message::Reset => self.dispatch(Action::Reset),
            Message::Refresh => {
                self.notice = None;
                self.dispatch(Action::Refresh)
            }
            Message::Applied { notice, result } => {
                match result {
                    Ok(snapshot) => {
                        self.show(snapshot);
                        if let Some(notice) = notice {
                            self.notice = Some(notice.to_string());
                        }
                    }
                    Err(e) => self.notice = Some(e),
                }
                Command::none()
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        match &self.screen {
            Screen::Dashboard(snapshot) if snapshot.run_state.is_running() => {
                iced::time::every(REFRESH_INTERVAL).map(|_| Message::Refresh)
            }
            _ => Subscription::none(),
        }
    }

    fn dispatch(&mut self, action: Action) -> Command<Message> {
        let Some(controller) = self.controller.clone() else {
            return Command::none();
        };
        if action.notice().is_some() {
            self.notice = None;
        }
        let notice = action.notice();
        Command::perform(apply(controller, action), move |result| Message::Applied {
            notice,
            result,
        })
    }

    fn show(&mut self, snapshot: DashboardSnapshot) {
        if snapshot.run_state == RunState::Unconfigured {
            if !matches!(self.screen, Screen::Wizard(_)) {
                self.screen = Screen::Wizard(SetupWizard::new());
            }
        } else {
            self.screen = Screen::Dashboard(snapshot);
        }
    }

    pub fn view(&self) -> Element<'_, Message, Theme> {
        let content: Element<'_, Message, Theme> = match &self.screen {
            Screen::Loading => text("Loading settings...").size(16).into(),
            Screen::Failed(e) => column![
                text("Could not start the application").size(20),
                text(e).size(14).style(ERROR_COLOR),
            ]
            .spacing(10)
            .into(),
            Screen::Wizard(wizard) => wizard_view(wizard),
            Screen::Dashboard(snapshot) => dashboard_view(snapshot),
        };

        let mut page = Column::new()
            .spacing(20)
            .push(text(APP_TITLE).size(24))
            .push(content);
        if let Some(notice) = &self.notice {
            page = page.push(text(notice).size(14).style(MUTED_COLOR));
        }

        container(page)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }
}

async fn load(config: AppConfig) -> Result<SharedController, String> {
    bootstrap(&config)
        .await
        .map(SharedController::new)
        .map_err(|e| {
            e.log_error();
            e.user_friendly_message()
        })
}

async fn apply(controller: SharedController, action: Action) -> Result<DashboardSnapshot, String> {
    let mut controller = controller.0.lock().await;
    let result = match action {
        Action::CompleteSetup(settings) => controller.complete_setup(settings).await,
        Action::Start => controller.start().await,
        Action::Stop => controller.stop().await,
        Action::SetToggle(toggle, enabled) => {
            controller.set_toggle(toggle, enabled).await.map(|_| ())
        }
        Action::Reset => controller.reset().await,
        Action::Refresh => Ok(()),
    };

    result.map_err(|e| {
        e.log_error();
        e.user_friendly_message()
    })?;
    Ok(controller.snapshot())
}

fn wizard_view(wizard: &SetupWizard) -> Element<'_, Message, Theme> {
    let step = wizard.step();
    let draft = wizard.draft();

    let body: Element<'_, Message, Theme> = match step {
        WizardStep::Account => {
            let mut body = column![
                text("Which Instagram account should be monitored?").size(14),
                text_input("@username", &draft.monitored_account)
                    .on_input(Message::AccountChanged)
                    .on_submit(Message::WizardNext)
                    .padding(10),
            ]
            .spacing(10);
            if let Some(error) = wizard.error() {
                body = body.push(text(error).size(12).style(ERROR_COLOR));
            }
            body.into()
        }
        WizardStep::Templates => {
            let mut body = column![
                text("Use {caption} where the reel caption should appear.").size(14),
                text("Title").size(12),
                text_input("Title template", &draft.title_template)
                    .on_input(Message::TitleTemplateChanged)
                    .padding(10),
                text("Description").size(12),
                text_input("Description template", &draft.description_template)
                    .on_input(Message::DescriptionTemplateChanged)
                    .padding(10),
            ]
            .spacing(10);
            let missing = wizard.templates_without_caption();
            if !missing.is_empty() {
                body = body.push(
                    text(format!(
                        "The {} will not include the caption.",
                        missing.join(" and ")
                    ))
                    .size(12)
                    .style(MUTED_COLOR),
                );
            }
            body.into()
        }
        WizardStep::Toggles => toggle_list(draft, Message::WizardToggled),
    };

    let mut buttons = row![].spacing(10);
    if step != WizardStep::Account {
        buttons = buttons.push(button("Back").on_press(Message::WizardBack).padding(10));
    }
    let next_label = if step == WizardStep::Toggles {
        "Finish"
    } else {
        "Next"
    };
    buttons = buttons.push(button(next_label).on_press(Message::WizardNext).padding(10));

    column![
        text(format!("Step {} of 3: {}", step.number(), step.title())).size(18),
        body,
        buttons,
    ]
    .spacing(20)
    .into()
}

fn dashboard_view(snapshot: &DashboardSnapshot) -> Element<'_, Message, Theme> {
    let status = &snapshot.status;
    let running = snapshot.run_state.is_running();

    let indicator = if running {
        text("Running").size(16).style(RUNNING_COLOR)
    } else {
        text("Stopped").size(16).style(MUTED_COLOR)
    };

    let mut page = Column::new().spacing(15).push(indicator);

    if status.degraded {
        let detail = status.last_error.as_deref().unwrap_or("unknown error");
        page = page.push(
            container(text(format!("Some checks are failing: {detail}")).style(ERROR_COLOR))
                .padding(10),
        );
    }

    if let Some(settings) = &snapshot.settings {
        page = page.push(text(format!("Monitoring @{}", settings.monitored_account)).size(16));
    }

    page = page
        .push(text(format!("Last check: {}", format_time(status.last_check))).size(14))
        .push(text(format!("Next check: {}", format_time(status.next_check))).size(14))
        .push(
            row![
                text(format!("Downloaded: {}", status.videos_downloaded)).size(14),
                text(format!("Uploaded: {}", status.videos_uploaded)).size(14),
                text(format!("Failed: {}", status.failed_items)).size(14),
            ]
            .spacing(20),
        );

    if let Some(settings) = &snapshot.settings {
        page = page.push(toggle_list(settings, Message::ToggleChanged));
    }

    let run_button = if running {
        button("Stop").on_press(Message::Stop)
    } else {
        button("Start").on_press(Message::Start)
    };

    page.push(
        row![
            run_button.padding(10),
            Space::with_width(Length::Fill),
            button("Reset").on_press(Message::Reset).padding(10),
        ]
        .spacing(10),
    )
    .into()
}

fn toggle_list<'a>(
    settings: &Settings,
    on_toggle: fn(Toggle, bool) -> Message,
) -> Element<'a, Message, Theme> {
    Toggle::ALL
        .iter()
        .fold(Column::new().spacing(10), |list, &toggle| {
            list.push(
                column![
                    toggler(
                        toggle.label().to_string(),
                        settings.toggle(toggle),
                        move |enabled| on_toggle(toggle, enabled),
                    ),
                    text(toggle.description()).size(12).style(MUTED_COLOR),
                ]
                .spacing(4),
            )
        })
        .into()
}

fn format_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
