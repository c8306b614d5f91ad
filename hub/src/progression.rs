use anyhow::{Context, Result};
use tracing::info;

use crate::db::Database;
use crate::db::models::UserProfile;

/// Experience for a Triki win.
pub const TRIKI_WIN_EXP: u32 = 15;

/// Experience per food eaten in a Snake run.
pub const SNAKE_EXP_PER_FOOD: u32 = 2;

/// Experience needed to leave `level`.
pub fn experience_threshold(level: u32) -> u32 {
    100 * level.max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AvatarTier {
    None,
    Tier1,
    Tier2,
    Tier3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmeticUnlock {
    pub level: u32,
    pub tier: AvatarTier,
    pub avatar: &'static str,
}

// Ordered low → high
pub const COSMETIC_UNLOCKS: &[CosmeticUnlock] = &[
    CosmeticUnlock { level: 5, tier: AvatarTier::Tier1, avatar: "avatar_tier1.png" },
    CosmeticUnlock { level: 10, tier: AvatarTier::Tier2, avatar: "avatar_tier2.png" },
    CosmeticUnlock { level: 20, tier: AvatarTier::Tier3, avatar: "avatar_tier3.png" },
];

/// Tier of the cosmetic avatar currently on the profile.
pub fn avatar_tier(avatar_special: Option<&str>) -> AvatarTier {
    avatar_special
        .and_then(|avatar| COSMETIC_UNLOCKS.iter().find(|unlock| unlock.avatar == avatar))
        .map(|unlock| unlock.tier)
        .unwrap_or(AvatarTier::None)
}

/// Highest cosmetic available at `level`.
pub fn cosmetic_for_level(level: u32) -> Option<&'static CosmeticUnlock> {
    COSMETIC_UNLOCKS.iter().rev().find(|unlock| level >= unlock.level)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExperienceResult {
    pub gained: u32,
    pub level: u32,
    pub exp: u32,
    pub leveled_up: bool,
    pub unlocked: Option<&'static str>,
}

/// Add `award` experience, advancing at most one level. The remainder stays
/// as experience even if it already covers the next threshold.
pub fn apply_experience(profile: &mut UserProfile, award: u32) -> ExperienceResult {
    profile.exp = profile.exp.saturating_add(award);

    let threshold = experience_threshold(profile.level);
    let leveled_up = profile.exp >= threshold;
    if leveled_up {
        profile.exp -= threshold;
        profile.level += 1;
    }

    let unlocked = if leveled_up { apply_cosmetic(profile) } else { None };

    ExperienceResult {
        gained: award,
        level: profile.level,
        exp: profile.exp,
        leveled_up,
        unlocked,
    }
}

/// Swap in the cosmetic for the profile's level if it outranks the current
/// one. Lower tiers never replace higher ones.
pub fn apply_cosmetic(profile: &mut UserProfile) -> Option<&'static str> {
    let unlock = cosmetic_for_level(profile.level)?;
    if unlock.tier <= avatar_tier(profile.avatar_special.as_deref()) {
        return None;
    }
    profile.avatar_special = Some(unlock.avatar.to_string());
    profile.custom_avatar = None;
    Some(unlock.avatar)
}

/// Load the profile, apply `award` and write it back.
pub async fn persist_experience(db: &dyn Database, user_id: &str, award: u32) -> Result<ExperienceResult> {
    // Nothing to write for a zero award
    if award == 0 {
        let profile = db.get_profile(user_id).await?;
        return Ok(ExperienceResult {
            level: profile.level,
            exp: profile.exp,
            ..ExperienceResult::default()
        });
    }

    let mut profile = db
        .get_profile(user_id)
        .await
        .context("Failed to load profile")?;
    let result = apply_experience(&mut profile, award);
    db.save_profile(user_id, &profile)
        .await
        .context("Failed to save profile")?;

    if result.leveled_up {
        info!("User {} reached level {} ({} exp carried over)", user_id, result.level, result.exp);
    }
    if let Some(avatar) = result.unlocked {
        info!("User {} unlocked avatar {}", user_id, avatar);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDatabase;

    #[test]
    fn test_threshold_increases_with_level() {
        assert_eq!(experience_threshold(1), 100);
        assert_eq!(experience_threshold(2), 200);
        assert!(experience_threshold(10) > experience_threshold(9));
    }

    #[test]
    fn test_below_threshold_keeps_level() {
        let mut profile = UserProfile::default();
        let result = apply_experience(&mut profile, 60);
        assert_eq!((profile.level, profile.exp), (1, 60));
        assert!(!result.leveled_up);
    }

    #[test]
    fn test_single_level_per_award() {
        // 350 exp crosses both the level-1 (100) and level-2 (200) thresholds
        let mut profile = UserProfile::default();
        let result = apply_experience(&mut profile, 350);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.exp, 250);
        assert!(result.leveled_up);

        // The next award levels once more
        apply_experience(&mut profile, 10);
        assert_eq!(profile.level, 3);
        assert_eq!(profile.exp, 60);
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let mut profile = UserProfile { level: 2, exp: 150, ..UserProfile::default() };
        apply_experience(&mut profile, 50);
        assert_eq!((profile.level, profile.exp), (3, 0));
    }

    #[test]
    fn test_cosmetic_unlock_clears_custom_avatar() {
        let mut profile = UserProfile {
            level: 4,
            exp: 390,
            custom_avatar: Some("me.png".to_string()),
            ..UserProfile::default()
        };
        let result = apply_experience(&mut profile, 20);
        assert_eq!(profile.level, 5);
        assert_eq!(result.unlocked, Some("avatar_tier1.png"));
        assert_eq!(profile.avatar_special.as_deref(), Some("avatar_tier1.png"));
        assert_eq!(profile.custom_avatar, None);
    }

    #[test]
    fn test_cosmetic_never_downgrades() {
        let mut profile = UserProfile {
            level: 6,
            avatar_special: Some("avatar_tier3.png".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(apply_cosmetic(&mut profile), None);
        assert_eq!(profile.avatar_special.as_deref(), Some("avatar_tier3.png"));
    }

    #[test]
    fn test_tier_ordering() {
        assert!(AvatarTier::None < AvatarTier::Tier1);
        assert!(AvatarTier::Tier2 < AvatarTier::Tier3);
        assert_eq!(avatar_tier(Some("unknown.png")), AvatarTier::None);
        assert_eq!(cosmetic_for_level(4), None);
        assert_eq!(cosmetic_for_level(12).map(|u| u.tier), Some(AvatarTier::Tier2));
    }

    #[tokio::test]
    async fn test_persist_experience() {
        let db = InMemoryDatabase::new();
        let result = persist_experience(&db, "ana", 120).await.unwrap();
        assert!(result.leveled_up);
        let profile = db.get_profile("ana").await.unwrap();
        assert_eq!((profile.level, profile.exp), (2, 20));
    }
}
