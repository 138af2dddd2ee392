use crate::core::schema::{self, Category};
use crate::models::{AskedStatus, CategoryProgress, Ledger, Profile};

/// Profile completion percentage (0-100).
///
/// Counts how many of the required fields hold a value. Only this number
/// gates feature access; the per-category view below is display-only.
#[inline]
pub fn completion_score(profile: &Profile) -> u8 {
    let required = schema::required_for_completion();
    let filled = required.iter().filter(|&&id| profile.is_filled(id)).count();

    (100.0 * filled as f64 / required.len() as f64).round() as u8
}

/// Per-category progress over the full question catalog.
///
/// A field counts as answered once it holds a profile value or an answered
/// ledger entry; skipped fields come from the ledger only.
pub fn category_progress(profile: &Profile, ledger: &Ledger) -> Vec<CategoryProgress> {
    Category::ALL
        .iter()
        .map(|&category| {
            let mut answered = 0;
            let mut skipped = 0;
            let mut total = 0;

            for field in schema::fields().iter().filter(|f| f.category == category) {
                total += 1;
                if profile.is_filled(field.id)
                    || ledger.get(field.id).map(|e| e.status) == Some(AskedStatus::Answered)
                {
                    answered += 1;
                } else if ledger.get(field.id).map(|e| e.status) == Some(AskedStatus::Skipped) {
                    skipped += 1;
                }
            }

            CategoryProgress {
                category,
                answered,
                skipped,
                remaining: total - answered - skipped,
                total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldId;
    use crate::models::{FieldValue, LedgerEntry};
    use chrono::Utc;

    #[test]
    fn test_empty_profile_scores_zero() {
        assert_eq!(completion_score(&Profile::default()), 0);
    }

    #[test]
    fn test_one_required_field_scores_six() {
        let mut profile = Profile::default();
        profile.name = Some("Lena".to_string());
        assert_eq!(completion_score(&profile), 6);
    }

    #[test]
    fn test_all_required_fields_score_hundred() {
        let mut profile = Profile::default();
        for &id in schema::required_for_completion() {
            let value = match schema::spec(id).domain {
                schema::FieldDomain::Integer { min, .. } => FieldValue::Integer(min),
                _ => FieldValue::Text("something".to_string()),
            };
            profile.set(id, value).unwrap();
        }
        assert_eq!(completion_score(&profile), 100);
    }

    #[test]
    fn test_score_is_monotonic_and_bounded() {
        let mut profile = Profile::default();
        let mut last = completion_score(&profile);

        for &id in schema::required_for_completion() {
            let value = match schema::spec(id).domain {
                schema::FieldDomain::Integer { min, .. } => FieldValue::Integer(min),
                _ => FieldValue::Text("filled".to_string()),
            };
            profile.set(id, value).unwrap();

            let score = completion_score(&profile);
            assert!(score >= last, "score decreased: {} -> {}", last, score);
            assert!(score <= 100);
            last = score;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_non_required_fields_do_not_move_the_score() {
        let mut profile = Profile::default();
        profile.job_title = Some("Nurse".to_string());
        profile.pet_description = Some("A grumpy cat".to_string());
        assert_eq!(completion_score(&profile), 0);
    }

    #[test]
    fn test_category_progress_counts() {
        let mut profile = Profile::default();
        profile.name = Some("Lena".to_string());

        let mut ledger = Ledger::new();
        ledger.upsert(LedgerEntry {
            field_id: FieldId::Age,
            status: AskedStatus::Skipped,
            misses: 2,
            asked_at: Utc::now(),
        });

        let progress = category_progress(&profile, &ledger);
        assert_eq!(progress.len(), 14);

        let identity = &progress[0];
        assert_eq!(identity.category, Category::Identity);
        assert_eq!(identity.total, 3);
        assert_eq!(identity.answered, 1);
        assert_eq!(identity.skipped, 1);
        assert_eq!(identity.remaining, 1);

        let totals: usize = progress.iter().map(|c| c.total).sum();
        assert_eq!(totals, schema::fields().len());
    }
}
