use serde::{Deserialize, Serialize};

/// Profile categories, in question priority order
///
/// The order of this list is the order in which Diana works through the
/// interview: identity first, partner preferences last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Identity,
    Location,
    Physical,
    Family,
    Career,
    Beliefs,
    Health,
    Lifestyle,
    Pets,
    Hobbies,
    Travel,
    Relocation,
    Relationship,
    Preferences,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Identity,
        Category::Location,
        Category::Physical,
        Category::Family,
        Category::Career,
        Category::Beliefs,
        Category::Health,
        Category::Lifestyle,
        Category::Pets,
        Category::Hobbies,
        Category::Travel,
        Category::Relocation,
        Category::Relationship,
        Category::Preferences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Identity => "identity",
            Category::Location => "location",
            Category::Physical => "physical",
            Category::Family => "family",
            Category::Career => "career",
            Category::Beliefs => "beliefs",
            Category::Health => "health",
            Category::Lifestyle => "lifestyle",
            Category::Pets => "pets",
            Category::Hobbies => "hobbies",
            Category::Travel => "travel",
            Category::Relocation => "relocation",
            Category::Relationship => "relationship",
            Category::Preferences => "preferences",
        }
    }
}

/// Identifier of a single profile field
///
/// Declaration order matches the registry order in `FIELDS`; `spec()` relies
/// on that alignment for O(1) lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    Name,
    Age,
    Gender,
    CurrentCity,
    OriginCity,
    DesiredCity,
    HeightCm,
    HeightPreference,
    MaritalStatus,
    HaveChildren,
    WantChildren,
    EducationLevel,
    EmploymentStatus,
    JobTitle,
    WorkLifeBalance,
    Religion,
    PracticeLevel,
    LifeGoal,
    HealthStatus,
    HasDisability,
    DisabilityType,
    DisabilityPreference,
    Smoking,
    Drinking,
    Diet,
    SleepSchedule,
    Volunteering,
    HasPet,
    PetDescription,
    PhysicalHobbies,
    CulturalHobbies,
    CreativeHobbies,
    GamingHobbies,
    TravelFrequency,
    TripType,
    TravelStyle,
    TravelPlanning,
    RelocateWithinCountry,
    RelocateAbroad,
    RelationshipRole,
    PartnerAgeRange,
    RedFlags,
}

impl FieldId {
    /// Wire name of the field (snake_case, as stored and as sent to the LLM)
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::Age => "age",
            FieldId::Gender => "gender",
            FieldId::CurrentCity => "current_city",
            FieldId::OriginCity => "origin_city",
            FieldId::DesiredCity => "desired_city",
            FieldId::HeightCm => "height_cm",
            FieldId::HeightPreference => "height_preference",
            FieldId::MaritalStatus => "marital_status",
            FieldId::HaveChildren => "have_children",
            FieldId::WantChildren => "want_children",
            FieldId::EducationLevel => "education_level",
            FieldId::EmploymentStatus => "employment_status",
            FieldId::JobTitle => "job_title",
            FieldId::WorkLifeBalance => "work_life_balance",
            FieldId::Religion => "religion",
            FieldId::PracticeLevel => "practice_level",
            FieldId::LifeGoal => "life_goal",
            FieldId::HealthStatus => "health_status",
            FieldId::HasDisability => "has_disability",
            FieldId::DisabilityType => "disability_type",
            FieldId::DisabilityPreference => "disability_preference",
            FieldId::Smoking => "smoking",
            FieldId::Drinking => "drinking",
            FieldId::Diet => "diet",
            FieldId::SleepSchedule => "sleep_schedule",
            FieldId::Volunteering => "volunteering",
            FieldId::HasPet => "has_pet",
            FieldId::PetDescription => "pet_description",
            FieldId::PhysicalHobbies => "physical_hobbies",
            FieldId::CulturalHobbies => "cultural_hobbies",
            FieldId::CreativeHobbies => "creative_hobbies",
            FieldId::GamingHobbies => "gaming_hobbies",
            FieldId::TravelFrequency => "travel_frequency",
            FieldId::TripType => "trip_type",
            FieldId::TravelStyle => "travel_style",
            FieldId::TravelPlanning => "travel_planning",
            FieldId::RelocateWithinCountry => "relocate_within_country",
            FieldId::RelocateAbroad => "relocate_abroad",
            FieldId::RelationshipRole => "relationship_role",
            FieldId::PartnerAgeRange => "partner_age_range",
            FieldId::RedFlags => "red_flags",
        }
    }

    /// Parse a wire name back into a field id
    pub fn parse(s: &str) -> Option<FieldId> {
        FIELDS.iter().find(|f| f.id.as_str() == s).map(|f| f.id)
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value domain of a profile field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDomain {
    /// Closed set of lower-case snake_case tokens
    Enum(&'static [&'static str]),
    /// Integer within an inclusive range
    Integer { min: i64, max: i64 },
    /// Arbitrary trimmed text
    FreeText,
    /// List of trimmed, de-duplicated strings
    StringArray,
}

/// One entry of the field catalog
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub id: FieldId,
    pub category: Category,
    pub domain: FieldDomain,
    /// Base question text, without the rendered option group
    pub prompt: &'static str,
}

/// The full question catalog, in priority order.
///
/// Selection walks this list front to back; see `core::selector`.
static FIELDS: &[FieldSpec] = &[
    // identity
    FieldSpec {
        id: FieldId::Name,
        category: Category::Identity,
        domain: FieldDomain::FreeText,
        prompt: "What's your name?",
    },
    FieldSpec {
        id: FieldId::Age,
        category: Category::Identity,
        domain: FieldDomain::Integer { min: 18, max: 99 },
        prompt: "How old are you?",
    },
    FieldSpec {
        id: FieldId::Gender,
        category: Category::Identity,
        domain: FieldDomain::Enum(&["male", "female", "other"]),
        prompt: "How do you identify?",
    },
    // location
    FieldSpec {
        id: FieldId::CurrentCity,
        category: Category::Location,
        domain: FieldDomain::FreeText,
        prompt: "Which city do you currently live in?",
    },
    FieldSpec {
        id: FieldId::OriginCity,
        category: Category::Location,
        domain: FieldDomain::FreeText,
        prompt: "Where are you originally from?",
    },
    FieldSpec {
        id: FieldId::DesiredCity,
        category: Category::Location,
        domain: FieldDomain::FreeText,
        prompt: "If you could live anywhere, where would that be?",
    },
    // physical
    FieldSpec {
        id: FieldId::HeightCm,
        category: Category::Physical,
        domain: FieldDomain::Integer { min: 100, max: 250 },
        prompt: "How tall are you, in centimeters?",
    },
    FieldSpec {
        id: FieldId::HeightPreference,
        category: Category::Physical,
        domain: FieldDomain::Enum(&["shorter", "similar", "taller", "no_preference"]),
        prompt: "Do you have a preference for your partner's height?",
    },
    // family
    FieldSpec {
        id: FieldId::MaritalStatus,
        category: Category::Family,
        domain: FieldDomain::Enum(&["single", "divorced", "widowed", "separated"]),
        prompt: "What's your marital status?",
    },
    FieldSpec {
        id: FieldId::HaveChildren,
        category: Category::Family,
        domain: FieldDomain::Enum(&["yes", "no"]),
        prompt: "Do you have children?",
    },
    FieldSpec {
        id: FieldId::WantChildren,
        category: Category::Family,
        domain: FieldDomain::Enum(&["yes", "no", "maybe"]),
        prompt: "Would you like to have children someday?",
    },
    // career
    FieldSpec {
        id: FieldId::EducationLevel,
        category: Category::Career,
        domain: FieldDomain::Enum(&["high_school", "bachelors", "masters", "doctorate", "other"]),
        prompt: "What's your highest level of education?",
    },
    FieldSpec {
        id: FieldId::EmploymentStatus,
        category: Category::Career,
        domain: FieldDomain::Enum(&["employed", "self_employed", "student", "unemployed", "retired"]),
        prompt: "What do you currently do for work?",
    },
    FieldSpec {
        id: FieldId::JobTitle,
        category: Category::Career,
        domain: FieldDomain::FreeText,
        prompt: "What's your job title or profession?",
    },
    FieldSpec {
        id: FieldId::WorkLifeBalance,
        category: Category::Career,
        domain: FieldDomain::Enum(&["work_focused", "balanced", "life_focused"]),
        prompt: "How would you describe your work-life balance?",
    },
    // beliefs
    FieldSpec {
        id: FieldId::Religion,
        category: Category::Beliefs,
        domain: FieldDomain::Enum(&[
            "christianity",
            "islam",
            "judaism",
            "hinduism",
            "buddhism",
            "spiritual",
            "none",
            "other",
        ]),
        prompt: "Which faith or belief system do you identify with?",
    },
    FieldSpec {
        id: FieldId::PracticeLevel,
        category: Category::Beliefs,
        domain: FieldDomain::Enum(&["devout", "practicing", "occasional", "non_practicing"]),
        prompt: "How actively do you practice?",
    },
    FieldSpec {
        id: FieldId::LifeGoal,
        category: Category::Beliefs,
        domain: FieldDomain::FreeText,
        prompt: "What would you say is your biggest goal in life?",
    },
    // health
    FieldSpec {
        id: FieldId::HealthStatus,
        category: Category::Health,
        domain: FieldDomain::Enum(&["excellent", "good", "fair", "poor"]),
        prompt: "How would you rate your overall health?",
    },
    FieldSpec {
        id: FieldId::HasDisability,
        category: Category::Health,
        domain: FieldDomain::Enum(&["yes", "no"]),
        prompt: "Do you live with a disability?",
    },
    FieldSpec {
        id: FieldId::DisabilityType,
        category: Category::Health,
        domain: FieldDomain::FreeText,
        prompt: "Would you like to share more about it?",
    },
    FieldSpec {
        id: FieldId::DisabilityPreference,
        category: Category::Health,
        domain: FieldDomain::Enum(&["open", "prefer_not", "no_preference"]),
        prompt: "How do you feel about a partner living with a disability?",
    },
    // lifestyle
    FieldSpec {
        id: FieldId::Smoking,
        category: Category::Lifestyle,
        domain: FieldDomain::Enum(&["never", "occasionally", "regularly", "quitting"]),
        prompt: "Do you smoke?",
    },
    FieldSpec {
        id: FieldId::Drinking,
        category: Category::Lifestyle,
        domain: FieldDomain::Enum(&["never", "socially", "regularly"]),
        prompt: "Do you drink alcohol?",
    },
    FieldSpec {
        id: FieldId::Diet,
        category: Category::Lifestyle,
        domain: FieldDomain::Enum(&["omnivore", "vegetarian", "vegan", "halal", "kosher", "other"]),
        prompt: "How would you describe your diet?",
    },
    FieldSpec {
        id: FieldId::SleepSchedule,
        category: Category::Lifestyle,
        domain: FieldDomain::Enum(&["early_bird", "night_owl", "flexible"]),
        prompt: "Are you more of an early bird or a night owl?",
    },
    FieldSpec {
        id: FieldId::Volunteering,
        category: Category::Lifestyle,
        domain: FieldDomain::Enum(&["regularly", "sometimes", "never"]),
        prompt: "Do you volunteer or give back to your community?",
    },
    // pets
    FieldSpec {
        id: FieldId::HasPet,
        category: Category::Pets,
        domain: FieldDomain::Enum(&["yes", "no"]),
        prompt: "Do you have any pets?",
    },
    FieldSpec {
        id: FieldId::PetDescription,
        category: Category::Pets,
        domain: FieldDomain::FreeText,
        prompt: "Tell me about your pet!",
    },
    // hobbies
    FieldSpec {
        id: FieldId::PhysicalHobbies,
        category: Category::Hobbies,
        domain: FieldDomain::StringArray,
        prompt: "Which sports or physical activities do you enjoy?",
    },
    FieldSpec {
        id: FieldId::CulturalHobbies,
        category: Category::Hobbies,
        domain: FieldDomain::StringArray,
        prompt: "What cultural activities do you enjoy, like museums, concerts or theatre?",
    },
    FieldSpec {
        id: FieldId::CreativeHobbies,
        category: Category::Hobbies,
        domain: FieldDomain::StringArray,
        prompt: "Do you have any creative hobbies?",
    },
    FieldSpec {
        id: FieldId::GamingHobbies,
        category: Category::Hobbies,
        domain: FieldDomain::StringArray,
        prompt: "Do you play any games, video or otherwise?",
    },
    // travel
    FieldSpec {
        id: FieldId::TravelFrequency,
        category: Category::Travel,
        domain: FieldDomain::Enum(&["rarely", "yearly", "few_times_a_year", "monthly"]),
        prompt: "How often do you travel?",
    },
    FieldSpec {
        id: FieldId::TripType,
        category: Category::Travel,
        domain: FieldDomain::Enum(&["beach", "city", "nature", "adventure", "cultural"]),
        prompt: "What kind of trips do you prefer?",
    },
    FieldSpec {
        id: FieldId::TravelStyle,
        category: Category::Travel,
        domain: FieldDomain::Enum(&["luxury", "comfort", "budget", "backpacking"]),
        prompt: "What's your travel style?",
    },
    FieldSpec {
        id: FieldId::TravelPlanning,
        category: Category::Travel,
        domain: FieldDomain::Enum(&["detailed_planner", "rough_plan", "spontaneous"]),
        prompt: "Are you a planner or more spontaneous when travelling?",
    },
    // relocation
    FieldSpec {
        id: FieldId::RelocateWithinCountry,
        category: Category::Relocation,
        domain: FieldDomain::Enum(&["yes", "no", "maybe"]),
        prompt: "Would you move to another city in your country for the right person?",
    },
    FieldSpec {
        id: FieldId::RelocateAbroad,
        category: Category::Relocation,
        domain: FieldDomain::Enum(&["yes", "no", "maybe"]),
        prompt: "Would you move abroad for the right person?",
    },
    // relationship
    FieldSpec {
        id: FieldId::RelationshipRole,
        category: Category::Relationship,
        domain: FieldDomain::Enum(&["traditional", "egalitarian", "flexible"]),
        prompt: "What role do you see yourself taking in a relationship?",
    },
    // preferences
    FieldSpec {
        id: FieldId::PartnerAgeRange,
        category: Category::Preferences,
        domain: FieldDomain::FreeText,
        prompt: "What age range are you looking for in a partner? (e.g. 25-35)",
    },
    FieldSpec {
        id: FieldId::RedFlags,
        category: Category::Preferences,
        domain: FieldDomain::StringArray,
        prompt: "Are there any absolute deal-breakers for you?",
    },
];

/// Subset of fields counted by the completion percentage.
///
/// This list gates feature access and is deliberately independent from the
/// full catalog above, which only drives progress display.
pub const REQUIRED_FOR_COMPLETION: [FieldId; 16] = [
    FieldId::Name,
    FieldId::Age,
    FieldId::Gender,
    FieldId::HeightCm,
    FieldId::CurrentCity,
    FieldId::EducationLevel,
    FieldId::EmploymentStatus,
    FieldId::Religion,
    FieldId::PracticeLevel,
    FieldId::Smoking,
    FieldId::Drinking,
    FieldId::LifeGoal,
    FieldId::MaritalStatus,
    FieldId::HaveChildren,
    FieldId::WantChildren,
    FieldId::TravelFrequency,
];

/// All fields, in question priority order
pub fn fields() -> &'static [FieldSpec] {
    FIELDS
}

/// Spec of a single field
pub fn spec(id: FieldId) -> &'static FieldSpec {
    &FIELDS[id as usize]
}

/// Field ids counted by the completion percentage
pub fn required_for_completion() -> &'static [FieldId] {
    &REQUIRED_FOR_COMPLETION
}

/// Render a stored enum token for display, e.g. "few_times_a_year" ->
/// "Few times a year"
pub fn display_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for (i, c) in token.chars().enumerate() {
        if c == '_' {
            out.push(' ');
        } else if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Canonicalize free-form user/LLM input into token form, e.g.
/// "Early bird" -> "early_bird", "Non-practicing" -> "non_practicing"
pub fn canonical_token(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_sep = true;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_size() {
        assert_eq!(FIELDS.len(), 42);
        assert_eq!(REQUIRED_FOR_COMPLETION.len(), 16);
        assert_eq!(Category::ALL.len(), 14);
    }

    #[test]
    fn test_registry_order_matches_discriminants() {
        // spec() indexes FIELDS by discriminant
        for (i, field) in FIELDS.iter().enumerate() {
            assert_eq!(field.id as usize, i, "field {} out of order", field.id);
        }
    }

    #[test]
    fn test_required_fields_exist_in_registry() {
        for id in REQUIRED_FOR_COMPLETION {
            assert!(FIELDS.iter().any(|f| f.id == id));
        }
    }

    #[test]
    fn test_every_category_has_fields() {
        for cat in Category::ALL {
            assert!(
                FIELDS.iter().any(|f| f.category == cat),
                "category {} has no fields",
                cat.as_str()
            );
        }
    }

    #[test]
    fn test_categories_are_contiguous() {
        // The catalog walks one category at a time
        let mut seen: Vec<Category> = Vec::new();
        for field in FIELDS {
            if seen.last() != Some(&field.category) {
                assert!(!seen.contains(&field.category));
                seen.push(field.category);
            }
        }
        assert_eq!(seen, Category::ALL.to_vec());
    }

    #[test]
    fn test_parse_round_trip() {
        for field in FIELDS {
            assert_eq!(FieldId::parse(field.id.as_str()), Some(field.id));
        }
        assert_eq!(FieldId::parse("not_a_field"), None);
    }

    #[test]
    fn test_enum_tokens_are_canonical() {
        for field in FIELDS {
            if let FieldDomain::Enum(tokens) = field.domain {
                for token in tokens {
                    assert_eq!(&canonical_token(token), token);
                }
            }
        }
    }

    #[test]
    fn test_display_token() {
        assert_eq!(display_token("few_times_a_year"), "Few times a year");
        assert_eq!(display_token("male"), "Male");
    }

    #[test]
    fn test_canonical_token() {
        assert_eq!(canonical_token("Early bird"), "early_bird");
        assert_eq!(canonical_token("  Non-practicing "), "non_practicing");
        assert_eq!(canonical_token("SELF employed"), "self_employed");
    }

    #[test]
    fn test_base_prompts_never_carry_slash_groups() {
        // Quick-reply buttons are parsed from "(a / b / c)" groups, which only
        // the selector may render from enum domains.
        for field in FIELDS {
            if let Some(open) = field.prompt.find('(') {
                let group = &field.prompt[open..];
                assert!(
                    !group.contains('/'),
                    "prompt for {} has a slash inside parentheses",
                    field.id
                );
            }
        }
    }
}
