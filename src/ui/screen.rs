use ratatui::Frame;

use crate::app::{App, AppState};
use crate::ui::dashboard::render_dashboard;

/// A UI screen boundary, responsible for drawing one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

pub struct PracticeScreen;

impl Screen for PracticeScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Statistics dashboard, drawn straight into the frame buffer
pub struct DashboardScreen;

impl Screen for DashboardScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_dashboard(app, area, f.buffer_mut());
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Practice => Box::new(PracticeScreen),
        AppState::Summary => Box::new(SummaryScreen),
        AppState::Dashboard => Box::new(DashboardScreen),
    }
}
