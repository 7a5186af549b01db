use anyhow::Context;
use gui::App;
use iced::{Application, Settings};
use reeltube_core::AppConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            "reeltube=debug,gui=debug,background_service=debug,platform_client=debug,settings_store=debug",
        )
        .init();

    tracing::info!("Starting {}", gui::APP_TITLE);

    let config = AppConfig::load_default().context("Failed to load configuration")?;

    let settings = Settings {
        window: iced::window::Settings {
            size: iced::Size::new(520.0, 720.0),
            min_size: Some(iced::Size::new(420.0, 560.0)),
            ..Default::default()
        },
        ..Settings::with_flags(config)
    };

    ReelTubeApp::run(settings).map_err(|e| {
        tracing::error!("Application error: {}", e);
        anyhow::anyhow!("GUI error: {e}")
    })
}

struct ReelTubeApp {
    app: App,
}

impl Application for ReelTubeApp {
    type Message = gui::Message;
    type Theme = iced::Theme;
    type Executor = iced::executor::Default;
    type Flags = AppConfig;

    fn new(flags: Self::Flags) -> (Self, iced::Command<Self::Message>) {
        tracing::info!("Initializing application");
        let (app, command) = App::new(flags);
        (Self { app }, command)
    }

    fn title(&self) -> String {
        gui::APP_TITLE.to_string()
    }

    fn update(&mut self, message: Self::Message) -> iced::Command<Self::Message> {
        self.app.update(message)
    }

    fn view(&self) -> iced::Element<Self::Message> {
        self.app.view()
    }

    fn subscription(&self) -> iced::Subscription<Self::Message> {
        self.app.subscription()
    }
}
