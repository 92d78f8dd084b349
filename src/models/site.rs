use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    pub tagline: String,
    pub subtext: String,
    pub cta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub number: u32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Founder {
    pub name: String,
    pub title: String,
    pub story: String,
    pub philosophy: Vec<String>,
    pub image_placeholder: bool,
}

/// Editable marketing copy for the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    pub brand: Brand,
    pub process_steps: Vec<ProcessStep>,
    pub founder: Founder,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrandPatch {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub subtext: Option<String>,
    pub cta: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub story: Option<String>,
    pub philosophy: Option<Vec<String>>,
    pub image_placeholder: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteRequest {
    pub brand: Option<BrandPatch>,
    pub process_steps: Option<Vec<ProcessStep>>,
    pub founder: Option<FounderPatch>,
}

impl SiteContent {
    /// Field-wise merge for brand and founder; process steps are replaced wholesale.
    pub fn merge(mut self, patch: UpdateSiteRequest) -> Self {
        if let Some(b) = patch.brand {
            if let Some(v) = b.name {
                self.brand.name = v;
            }
            if let Some(v) = b.tagline {
                self.brand.tagline = v;
            }
            if let Some(v) = b.subtext {
                self.brand.subtext = v;
            }
            if let Some(v) = b.cta {
                self.brand.cta = v;
            }
        }
        if let Some(steps) = patch.process_steps {
            self.process_steps = steps;
        }
        if let Some(f) = patch.founder {
            if let Some(v) = f.name {
                self.founder.name = v;
            }
            if let Some(v) = f.title {
                self.founder.title = v;
            }
            if let Some(v) = f.story {
                self.founder.story = v;
            }
            if let Some(v) = f.philosophy {
                self.founder.philosophy = v;
            }
            if let Some(v) = f.image_placeholder {
                self.founder.image_placeholder = v;
            }
        }
        self
    }
}

const DEFAULT_STEPS: [(&str, &str); 7] = [
    (
        "Ethical farms",
        "Sourced only from verified farms where cows are pasture-raised and treated with care.",
    ),
    (
        "Fresh milk",
        "Milk is collected within hours and transported under controlled conditions.",
    ),
    (
        "Curd setting",
        "Natural curd culture is added; no commercial starters. Overnight setting.",
    ),
    (
        "Hand churning",
        "Traditional wooden bilona. Hand-churned to separate butter from buttermilk.",
    ),
    (
        "Slow heating",
        "Butter is heated on low flame for hours until pure ghee separates. No rush.",
    ),
    (
        "Lab testing",
        "Every batch is tested for purity, A2 beta-casein, and contaminants. Results published.",
    ),
    (
        "Glass jar packing",
        "Packed in amber glass jars. No plastic. Shipped with care.",
    ),
];

const DEFAULT_STORY: &str = "I grew up around ghee, real ghee, made the way it was meant to be. \
When I couldn't find that quality in the market, I decided to make it myself.\n\n\
AMRYTUM exists because we believe food should be transparent. You deserve to know where your \
ghee comes from, how it's made, and what's in it. No marketing tricks. No hidden ingredients. \
Just one thing, done right.\n\n\
We work with a small network of ethical farms, use only A2 desi cow milk, and follow the bilona \
method from start to finish. Every batch is lab-tested and every report is public. That's the \
only way we know how to do it.";

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            brand: Brand {
                name: "AMRYTUM".to_string(),
                tagline: "From Farm to Ghee. No shortcuts.".to_string(),
                subtext: "Small batch A2 desi cow ghee made using the bilona method.".to_string(),
                cta: "Join the first batch".to_string(),
            },
            process_steps: DEFAULT_STEPS
                .iter()
                .enumerate()
                .map(|(i, (title, description))| ProcessStep {
                    number: i as u32 + 1,
                    title: title.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            founder: Founder {
                name: "Founder Name".to_string(),
                title: "Founder, AMRYTUM".to_string(),
                story: DEFAULT_STORY.to_string(),
                philosophy: vec![
                    "Radical transparency. Publish what we test.".to_string(),
                    "No shortcuts. Time and method matter.".to_string(),
                    "Respect the animal, the farmer, and the land.".to_string(),
                    "One product, done exceptionally well.".to_string(),
                ],
                image_placeholder: true,
            },
        }
    }
}
