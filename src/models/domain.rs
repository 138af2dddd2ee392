use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::schema::{Category, FieldId};

/// A user's dating profile. Every field stays null until Diana has
/// extracted a confident answer for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub current_city: Option<String>,
    pub origin_city: Option<String>,
    pub desired_city: Option<String>,
    pub height_cm: Option<u16>,
    pub height_preference: Option<String>,
    pub marital_status: Option<String>,
    pub have_children: Option<String>,
    pub want_children: Option<String>,
    pub education_level: Option<String>,
    pub employment_status: Option<String>,
    pub job_title: Option<String>,
    pub work_life_balance: Option<String>,
    pub religion: Option<String>,
    pub practice_level: Option<String>,
    pub life_goal: Option<String>,
    pub health_status: Option<String>,
    pub has_disability: Option<String>,
    pub disability_type: Option<String>,
    pub disability_preference: Option<String>,
    pub smoking: Option<String>,
    pub drinking: Option<String>,
    pub diet: Option<String>,
    pub sleep_schedule: Option<String>,
    pub volunteering: Option<String>,
    pub has_pet: Option<String>,
    pub pet_description: Option<String>,
    pub physical_hobbies: Option<Vec<String>>,
    pub cultural_hobbies: Option<Vec<String>>,
    pub creative_hobbies: Option<Vec<String>>,
    pub gaming_hobbies: Option<Vec<String>>,
    pub travel_frequency: Option<String>,
    pub trip_type: Option<String>,
    pub travel_style: Option<String>,
    pub travel_planning: Option<String>,
    pub relocate_within_country: Option<String>,
    pub relocate_abroad: Option<String>,
    pub relationship_role: Option<String>,
    pub partner_age_range: Option<String>,
    pub red_flags: Option<Vec<String>>,
    /// Cached completion percentage, recomputed every turn
    pub completion_score: Option<u8>,
}

/// A normalized field value, matched to the field's declared domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Integer(n) => serde_json::json!(n),
            FieldValue::Text(s) => serde_json::json!(s),
            FieldValue::List(items) => serde_json::json!(items),
        }
    }
}

/// A value shaped differently than the field's declared domain
#[derive(Debug, Clone, Error)]
#[error("value does not fit the domain of field {field}")]
pub struct DomainMismatch {
    pub field: FieldId,
}

fn text_value(v: &Option<String>) -> Option<FieldValue> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| FieldValue::Text(s.to_string()))
}

fn list_value(v: &Option<Vec<String>>) -> Option<FieldValue> {
    v.as_ref()
        .filter(|items| !items.is_empty())
        .map(|items| FieldValue::List(items.clone()))
}

impl Profile {
    /// Current value of a field, or None while unanswered.
    ///
    /// Empty strings and empty lists count as unanswered.
    pub fn value(&self, id: FieldId) -> Option<FieldValue> {
        match id {
            FieldId::Name => text_value(&self.name),
            FieldId::Age => self.age.map(|n| FieldValue::Integer(n as i64)),
            FieldId::Gender => text_value(&self.gender),
            FieldId::CurrentCity => text_value(&self.current_city),
            FieldId::OriginCity => text_value(&self.origin_city),
            FieldId::DesiredCity => text_value(&self.desired_city),
            FieldId::HeightCm => self.height_cm.map(|n| FieldValue::Integer(n as i64)),
            FieldId::HeightPreference => text_value(&self.height_preference),
            FieldId::MaritalStatus => text_value(&self.marital_status),
            FieldId::HaveChildren => text_value(&self.have_children),
            FieldId::WantChildren => text_value(&self.want_children),
            FieldId::EducationLevel => text_value(&self.education_level),
            FieldId::EmploymentStatus => text_value(&self.employment_status),
            FieldId::JobTitle => text_value(&self.job_title),
            FieldId::WorkLifeBalance => text_value(&self.work_life_balance),
            FieldId::Religion => text_value(&self.religion),
            FieldId::PracticeLevel => text_value(&self.practice_level),
            FieldId::LifeGoal => text_value(&self.life_goal),
            FieldId::HealthStatus => text_value(&self.health_status),
            FieldId::HasDisability => text_value(&self.has_disability),
            FieldId::DisabilityType => text_value(&self.disability_type),
            FieldId::DisabilityPreference => text_value(&self.disability_preference),
            FieldId::Smoking => text_value(&self.smoking),
            FieldId::Drinking => text_value(&self.drinking),
            FieldId::Diet => text_value(&self.diet),
            FieldId::SleepSchedule => text_value(&self.sleep_schedule),
            FieldId::Volunteering => text_value(&self.volunteering),
            FieldId::HasPet => text_value(&self.has_pet),
            FieldId::PetDescription => text_value(&self.pet_description),
            FieldId::PhysicalHobbies => list_value(&self.physical_hobbies),
            FieldId::CulturalHobbies => list_value(&self.cultural_hobbies),
            FieldId::CreativeHobbies => list_value(&self.creative_hobbies),
            FieldId::GamingHobbies => list_value(&self.gaming_hobbies),
            FieldId::TravelFrequency => text_value(&self.travel_frequency),
            FieldId::TripType => text_value(&self.trip_type),
            FieldId::TravelStyle => text_value(&self.travel_style),
            FieldId::TravelPlanning => text_value(&self.travel_planning),
            FieldId::RelocateWithinCountry => text_value(&self.relocate_within_country),
            FieldId::RelocateAbroad => text_value(&self.relocate_abroad),
            FieldId::RelationshipRole => text_value(&self.relationship_role),
            FieldId::PartnerAgeRange => text_value(&self.partner_age_range),
            FieldId::RedFlags => list_value(&self.red_flags),
        }
    }

    /// True once the field holds a non-empty value
    pub fn is_filled(&self, id: FieldId) -> bool {
        self.value(id).is_some()
    }

    /// Store a normalized value into a field.
    ///
    /// Callers normalize through `core::extraction::normalize_value` first;
    /// a variant that does not fit the field's shape is rejected, keeping the
    /// domain invariant intact.
    pub fn set(&mut self, id: FieldId, value: FieldValue) -> Result<(), DomainMismatch> {
        match (id, value) {
            (FieldId::Name, FieldValue::Text(s)) => self.name = Some(s),
            (FieldId::Age, FieldValue::Integer(n)) => self.age = Some(n as u8),
            (FieldId::Gender, FieldValue::Text(s)) => self.gender = Some(s),
            (FieldId::CurrentCity, FieldValue::Text(s)) => self.current_city = Some(s),
            (FieldId::OriginCity, FieldValue::Text(s)) => self.origin_city = Some(s),
            (FieldId::DesiredCity, FieldValue::Text(s)) => self.desired_city = Some(s),
            (FieldId::HeightCm, FieldValue::Integer(n)) => self.height_cm = Some(n as u16),
            (FieldId::HeightPreference, FieldValue::Text(s)) => self.height_preference = Some(s),
            (FieldId::MaritalStatus, FieldValue::Text(s)) => self.marital_status = Some(s),
            (FieldId::HaveChildren, FieldValue::Text(s)) => self.have_children = Some(s),
            (FieldId::WantChildren, FieldValue::Text(s)) => self.want_children = Some(s),
            (FieldId::EducationLevel, FieldValue::Text(s)) => self.education_level = Some(s),
            (FieldId::EmploymentStatus, FieldValue::Text(s)) => self.employment_status = Some(s),
            (FieldId::JobTitle, FieldValue::Text(s)) => self.job_title = Some(s),
            (FieldId::WorkLifeBalance, FieldValue::Text(s)) => self.work_life_balance = Some(s),
            (FieldId::Religion, FieldValue::Text(s)) => self.religion = Some(s),
            (FieldId::PracticeLevel, FieldValue::Text(s)) => self.practice_level = Some(s),
            (FieldId::LifeGoal, FieldValue::Text(s)) => self.life_goal = Some(s),
            (FieldId::HealthStatus, FieldValue::Text(s)) => self.health_status = Some(s),
            (FieldId::HasDisability, FieldValue::Text(s)) => self.has_disability = Some(s),
            (FieldId::DisabilityType, FieldValue::Text(s)) => self.disability_type = Some(s),
            (FieldId::DisabilityPreference, FieldValue::Text(s)) => {
                self.disability_preference = Some(s)
            }
            (FieldId::Smoking, FieldValue::Text(s)) => self.smoking = Some(s),
            (FieldId::Drinking, FieldValue::Text(s)) => self.drinking = Some(s),
            (FieldId::Diet, FieldValue::Text(s)) => self.diet = Some(s),
            (FieldId::SleepSchedule, FieldValue::Text(s)) => self.sleep_schedule = Some(s),
            (FieldId::Volunteering, FieldValue::Text(s)) => self.volunteering = Some(s),
            (FieldId::HasPet, FieldValue::Text(s)) => self.has_pet = Some(s),
            (FieldId::PetDescription, FieldValue::Text(s)) => self.pet_description = Some(s),
            (FieldId::PhysicalHobbies, FieldValue::List(v)) => self.physical_hobbies = Some(v),
            (FieldId::CulturalHobbies, FieldValue::List(v)) => self.cultural_hobbies = Some(v),
            (FieldId::CreativeHobbies, FieldValue::List(v)) => self.creative_hobbies = Some(v),
            (FieldId::GamingHobbies, FieldValue::List(v)) => self.gaming_hobbies = Some(v),
            (FieldId::TravelFrequency, FieldValue::Text(s)) => self.travel_frequency = Some(s),
            (FieldId::TripType, FieldValue::Text(s)) => self.trip_type = Some(s),
            (FieldId::TravelStyle, FieldValue::Text(s)) => self.travel_style = Some(s),
            (FieldId::TravelPlanning, FieldValue::Text(s)) => self.travel_planning = Some(s),
            (FieldId::RelocateWithinCountry, FieldValue::Text(s)) => {
                self.relocate_within_country = Some(s)
            }
            (FieldId::RelocateAbroad, FieldValue::Text(s)) => self.relocate_abroad = Some(s),
            (FieldId::RelationshipRole, FieldValue::Text(s)) => self.relationship_role = Some(s),
            (FieldId::PartnerAgeRange, FieldValue::Text(s)) => self.partner_age_range = Some(s),
            (FieldId::RedFlags, FieldValue::List(v)) => self.red_flags = Some(v),
            (field, _) => return Err(DomainMismatch { field }),
        }
        Ok(())
    }
}

/// Status of a field in the asked/skipped ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "asked_status", rename_all = "lowercase")]
pub enum AskedStatus {
    /// Question is open; the user has not given a usable answer yet
    Pending,
    Answered,
    Skipped,
}

/// One ledger row: a field Diana has surfaced to this user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "fieldId")]
    pub field_id: FieldId,
    pub status: AskedStatus,
    /// Consecutive abstentions while pending; the second one closes the field
    pub misses: i16,
    #[serde(rename = "askedAt")]
    pub asked_at: DateTime<Utc>,
}

/// The asked/skipped ledger of a single user
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn get(&self, id: FieldId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.field_id == id)
    }

    /// True when the field was answered or skipped and must never be
    /// re-selected
    pub fn is_closed(&self, id: FieldId) -> bool {
        matches!(
            self.get(id).map(|e| e.status),
            Some(AskedStatus::Answered) | Some(AskedStatus::Skipped)
        )
    }

    /// The currently open question, if any (most recently asked pending entry)
    pub fn pending(&self) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == AskedStatus::Pending)
            .max_by_key(|e| e.asked_at)
    }

    /// Insert or replace the entry for a field
    pub fn upsert(&mut self, entry: LedgerEntry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.field_id == entry.field_id)
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

}

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the Diana conversation, as passed to the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A persisted conversation message (Appwrite messages collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "receiverId", default)]
    pub receiver_id: Option<String>,
    pub content: String,
    #[serde(rename = "fromAssistant", default)]
    pub from_assistant: bool,
    #[serde(rename = "sentAt")]
    pub sent_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn as_chat_message(&self) -> ChatMessage {
        if self.from_assistant {
            ChatMessage::assistant(self.content.clone())
        } else {
            ChatMessage::user(self.content.clone())
        }
    }
}

/// Progress counts for one display category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category: Category,
    pub answered: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub total: usize,
}

/// Cached progress view served at session start and by /chat/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completion: u8,
    pub categories: Vec<CategoryProgress>,
    #[serde(rename = "nextField")]
    pub next_field: Option<FieldId>,
    #[serde(rename = "nextPrompt")]
    pub next_prompt: String,
}
