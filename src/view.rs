//! Render tree for the front page and the single-story view.
//!
//! The structs here are askama templates; composing them is pure and the
//! markup lives under `templates/`.

use std::collections::HashMap;

use askama::Template;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::api::Article;
use crate::app::RenderState;
use crate::config::{Config, Masthead, SectionConfig};
use crate::format::{
    continued_page, format_authors, format_header_date, relative_time, split_paragraphs,
    truncate_body, DEFAULT_WORD_LIMIT, PLACEHOLDER_BODY,
};
use crate::layout::{partition, Scaler, Slot, SlotAssignment};

const ISSUE_NUMBERS: [&str; 2] = ["3.14159", "4.2069"];

/// Static inputs to every render.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub masthead: Masthead,
    pub sections: Vec<SectionConfig>,
    pub scaler: Scaler,
}

impl PageSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            masthead: config.masthead.clone(),
            sections: config.sections.clone(),
            scaler: Scaler {
                base_width: config.base_width,
                margin: config.margin,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionOption {
    pub value: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct Header {
    pub title: String,
    pub tagline: String,
    pub edition_title: String,
    pub edition_blurb: String,
    pub city: String,
    pub date: String,
    pub volume_line: String,
    pub sections: Vec<SectionOption>,
}

impl Header {
    fn build<R: Rng + ?Sized>(
        settings: &PageSettings,
        selected: Option<u64>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let masthead = &settings.masthead;
        let issue = ISSUE_NUMBERS[rng.gen_range(0..ISSUE_NUMBERS.len())];

        Header {
            title: masthead.title.clone(),
            tagline: masthead.tagline.clone(),
            edition_title: masthead.edition_title.clone(),
            edition_blurb: masthead.edition_blurb.clone(),
            city: masthead.city.clone(),
            date: format_header_date(now.date_naive()),
            volume_line: format!("VOL. CLXX . . . No. {}", issue),
            sections: section_options(&settings.sections, selected),
        }
    }
}

/// Selector options with the current selection marked; an empty list hides the selector.
fn section_options(sections: &[SectionConfig], selected: Option<u64>) -> Vec<SectionOption> {
    if sections.is_empty() {
        return Vec::new();
    }

    let mut options = vec![SectionOption {
        value: String::new(),
        name: "All Sections".to_string(),
        selected: selected.is_none(),
    }];
    options.extend(sections.iter().map(|section| SectionOption {
        value: section.id.to_string(),
        name: section.name.clone(),
        selected: selected == Some(section.id),
    }));
    options
}

/// A single story as it appears in any slot; CSS decides how it looks.
#[derive(Debug, Clone)]
pub struct StoryCard {
    pub title: String,
    pub byline: String,
    pub permalink: String,
    pub image: Option<String>,
    pub dateline: String,
    pub body: String,
    pub continued_page: Option<u8>,
}

/// Card for one slot position. Empty positions render nothing.
pub fn story_card<R: Rng + ?Sized>(
    article: Option<&Article>,
    image: Option<&str>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<StoryCard> {
    let article = article?;
    let text: &str = if article.body_text.is_empty() {
        PLACEHOLDER_BODY
    } else {
        &article.body_text
    };
    let body = truncate_body(text, DEFAULT_WORD_LIMIT);

    Some(StoryCard {
        title: article.title.clone(),
        byline: format_authors(&article.author_names),
        permalink: article.permalink.clone(),
        image: image.map(str::to_string),
        dateline: relative_time(article.published_at, now),
        body: body.text,
        continued_page: body.truncated.then(|| continued_page(rng)),
    })
}

#[derive(Debug, Clone)]
pub struct SlotView {
    pub name: &'static str,
    pub stories: Vec<StoryCard>,
}

#[derive(Debug, Clone)]
pub struct StoryLayout {
    pub center_spread: SlotView,
    pub left_sidebar: SlotView,
    pub sidebar_spread: SlotView,
    pub bottom: SlotView,
    pub minis: Vec<SlotView>,
}

impl StoryLayout {
    fn build<R: Rng + ?Sized>(
        assignment: &SlotAssignment<'_>,
        images: &HashMap<u64, String>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let mut slot_view = |slot: Slot| SlotView {
            name: slot.name(),
            stories: assignment
                .positions(slot)
                .filter_map(|article| {
                    let image = article.and_then(|a| images.get(&a.id)).map(String::as_str);
                    story_card(article, image, now, rng)
                })
                .collect(),
        };

        StoryLayout {
            center_spread: slot_view(Slot::CenterSpread),
            left_sidebar: slot_view(Slot::LeftSidebar),
            sidebar_spread: slot_view(Slot::SidebarSpread),
            bottom: slot_view(Slot::Bottom),
            minis: vec![
                slot_view(Slot::Mini),
                slot_view(Slot::Mini2),
                slot_view(Slot::Mini3),
            ],
        }
    }

    /// All seven slot views in layout order.
    pub fn slots(&self) -> impl Iterator<Item = &SlotView> {
        [
            &self.center_spread,
            &self.left_sidebar,
            &self.sidebar_spread,
            &self.bottom,
        ]
        .into_iter()
        .chain(self.minis.iter())
    }
}

#[derive(Template)]
#[template(path = "front_page.html")]
pub struct FrontPage {
    pub header: Header,
    pub scale: f64,
    /// `None` while stories are loading
    pub layout: Option<StoryLayout>,
    pub footer: String,
    /// Sequence number of the frame this page is published as; the page
    /// polls for anything newer
    pub sequence: u64,
}

/// Build the front page for the current state.
pub fn compose<R: Rng + ?Sized>(
    state: &RenderState,
    settings: &PageSettings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> FrontPage {
    let header = Header::build(settings, state.section, now, rng);
    let layout = if state.loading {
        None
    } else {
        let assignment = partition(&state.stories);
        Some(StoryLayout::build(&assignment, &state.images, now, rng))
    };

    FrontPage {
        header,
        scale: settings.scaler.scale(state.viewport_width),
        layout,
        footer: settings.masthead.footer.clone(),
        sequence: 0,
    }
}

#[derive(Debug, Clone)]
pub struct FullStory {
    pub title: String,
    pub byline: String,
    pub permalink: String,
    pub image: Option<String>,
    pub dateline: String,
    pub paragraphs: Vec<String>,
}

#[derive(Template)]
#[template(path = "story_page.html")]
pub struct StoryPage {
    pub header: Header,
    pub scale: f64,
    /// `None` when the story could not be loaded
    pub story: Option<FullStory>,
    pub footer: String,
}

/// Build the single-story view; the body is shown in full.
pub fn compose_story<R: Rng + ?Sized>(
    story: Option<(&Article, Option<&str>)>,
    settings: &PageSettings,
    section: Option<u64>,
    scale: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> StoryPage {
    let story = story.map(|(article, image)| {
        let mut paragraphs = split_paragraphs(&article.body_html);
        if paragraphs.is_empty() {
            paragraphs.push(PLACEHOLDER_BODY.to_string());
        }
        FullStory {
            title: article.title.clone(),
            byline: format_authors(&article.author_names),
            permalink: article.permalink.clone(),
            image: image.map(str::to_string),
            dateline: relative_time(article.published_at, now),
            paragraphs,
        }
    });

    StoryPage {
        header: Header::build(settings, section, now, rng),
        scale,
        story,
        footer: settings.masthead.footer.clone(),
    }
}
