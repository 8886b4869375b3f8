use chrono::Utc;
use egui::{RichText, Ui};

use tridash::TridashError;
use tridash::feedback::{FeedbackChart, FeedbackData, load_feedback};
use tridash::i18n::{Locale, Text};
use tridash::model::CompetitionRace;
use tridash::timestamp::to_display_string;

use super::worker::Fetch;
use super::{ViewContext, error_banner, plot};

/// A participant's race: pick a competition, see sensor data over the swim, bike and run legs.
pub(crate) struct FeedbackView {
    competitions: Vec<CompetitionRace>,
    competitions_fetch: Fetch<Vec<CompetitionRace>>,
    competitions_requested: bool,
    selected: Option<String>,
    offset_minutes: u32,
    data: Option<FeedbackData>,
    data_fetch: Fetch<FeedbackData>,
    chart: Option<(u32, Locale, FeedbackChart)>,
    error: Option<TridashError>,
}

impl FeedbackView {
    pub(crate) fn new(offset_minutes: u32) -> Self {
        Self {
            competitions: Vec::new(),
            competitions_fetch: Fetch::new("competitions"),
            competitions_requested: false,
            selected: None,
            offset_minutes,
            data: None,
            data_fetch: Fetch::new("feedback"),
            chart: None,
            error: None,
        }
    }

    fn request_competitions(&mut self, view: &ViewContext) {
        let client = view.client.clone();
        self.competitions_fetch
            .start(view.worker, async move { client.competitions().await });
        self.competitions_requested = true;
    }

    fn request_feedback(&mut self, view: &ViewContext, competition_id: String) {
        self.data = None;
        self.chart = None;
        let client = view.client.clone();
        self.data_fetch.start(view.worker, async move {
            load_feedback(&client, &competition_id).await
        });
    }

    fn poll(&mut self) {
        if let Some(result) = self.competitions_fetch.poll() {
            match result {
                Ok(competitions) => self.competitions = competitions,
                Err(e) => self.error = Some(e),
            }
        }
        if let Some(result) = self.data_fetch.poll() {
            match result {
                Ok(data) => {
                    self.data = Some(data);
                    self.error = None;
                }
                Err(e) => self.error = Some(e),
            }
        }
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext) {
        if !self.competitions_requested {
            self.request_competitions(view);
        }
        self.poll();

        let mut choice = None;
        ui.horizontal(|ui| {
            ui.label(view.text(Text::Competitions));
            let selected_text = self
                .selected
                .as_ref()
                .and_then(|id| self.competitions.iter().find(|c| &c.id == id))
                .map_or_else(|| "-".to_string(), competition_label);
            egui::ComboBox::from_id_salt("feedback_competition")
                .selected_text(selected_text)
                .width(280.)
                .show_ui(ui, |ui| {
                    for competition in &self.competitions {
                        let is_selected = self.selected.as_ref() == Some(&competition.id);
                        if ui
                            .selectable_label(is_selected, competition_label(competition))
                            .clicked()
                        {
                            choice = Some(competition.id.clone());
                        }
                    }
                });
            ui.label(view.text(Text::OffsetMinutes));
            ui.add(egui::DragValue::new(&mut self.offset_minutes).range(0..=120));
            if self.competitions_fetch.is_loading() || self.data_fetch.is_loading() {
                ui.spinner();
            }
        });
        if let Some(id) = choice
            && self.selected.as_ref() != Some(&id)
        {
            self.selected = Some(id.clone());
            self.request_feedback(view, id);
        }

        let retry = self
            .error
            .as_ref()
            .is_some_and(|error| error_banner(ui, error, view.locale()));
        if retry {
            self.error = None;
            match self.selected.clone() {
                Some(id) => self.request_feedback(view, id),
                None => self.request_competitions(view),
            }
        }

        let Some(data) = &self.data else {
            if self.data_fetch.is_loading() {
                ui.label(view.text(Text::Loading));
            }
            return;
        };

        let locale = view.locale();
        let rebuild = self
            .chart
            .as_ref()
            .is_none_or(|(offset, built_for, _)| *offset != self.offset_minutes || *built_for != locale);
        if rebuild {
            let chart = FeedbackChart::build(data, self.offset_minutes, Utc::now(), locale);
            self.chart = Some((self.offset_minutes, locale, chart));
        }
        let Some((_, _, chart)) = &self.chart else {
            return;
        };

        if let Some(competition) = &data.competition {
            ui.label(RichText::new(competition_label(competition)).strong());
        }
        if let Some(range) = chart.window.range {
            ui.label(
                RichText::new(format!(
                    "{} - {}",
                    to_display_string(&range.start),
                    to_display_string(&range.end)
                ))
                .weak(),
            );
        }
        match chart.origin() {
            Some(origin) if chart.has_data() => {
                plot::sensor_plot(
                    ui,
                    "feedback_plot",
                    &chart.chart,
                    Some(&chart.window),
                    origin,
                    locale,
                );
            }
            _ => {
                ui.add_space(40.);
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(view.text(Text::NoData)).size(18.));
                });
            }
        }
    }
}

fn competition_label(competition: &CompetitionRace) -> String {
    format!("{} ({})", competition.name, competition.date)
}
