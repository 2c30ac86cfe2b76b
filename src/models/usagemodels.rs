use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user tallies for one calendar month, keyed by the first day of that month.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct UsageCounters {
    pub user_id: Uuid,
    pub period_start: NaiveDate,
    pub meal_plans_generated: i32,
    pub recipes_regenerated: i32,
    pub favorites_count: i32,
}

impl UsageCounters {
    pub fn empty(user_id: Uuid, period_start: NaiveDate) -> Self {
        Self {
            user_id,
            period_start,
            meal_plans_generated: 0,
            recipes_regenerated: 0,
            favorites_count: 0,
        }
    }

    pub fn get(&self, counter: UsageCounter) -> i64 {
        let value = match counter {
            UsageCounter::MealPlansGenerated => self.meal_plans_generated,
            UsageCounter::RecipesRegenerated => self.recipes_regenerated,
            UsageCounter::FavoritesCount => self.favorites_count,
        };
        i64::from(value)
    }

    pub fn increment(&mut self, counter: UsageCounter) {
        match counter {
            UsageCounter::MealPlansGenerated => self.meal_plans_generated += 1,
            UsageCounter::RecipesRegenerated => self.recipes_regenerated += 1,
            UsageCounter::FavoritesCount => self.favorites_count += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCounter {
    MealPlansGenerated,
    RecipesRegenerated,
    FavoritesCount,
}

impl UsageCounter {
    pub fn column(&self) -> &'static str {
        match self {
            UsageCounter::MealPlansGenerated => "meal_plans_generated",
            UsageCounter::RecipesRegenerated => "recipes_regenerated",
            UsageCounter::FavoritesCount => "favorites_count",
        }
    }
}

/// First day of the month `now` falls in (UTC).
pub fn current_period_start(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive())
}

/// Quota-controlled actions of the meal planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateMealPlan,
    RegenerateRecipe,
    AddFavorite,
    AddFamilyMember,
    UsePantry,
    UseLeftovers,
    ExportNutrition,
    CreateTemplate,
}

/// Features only premium users can use at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumFeature {
    Pantry,
    Leftovers,
    NutritionExport,
}

impl PremiumFeature {
    pub fn denial_reason(&self) -> &'static str {
        match self {
            PremiumFeature::Pantry => "The pantry is a premium feature",
            PremiumFeature::Leftovers => "Leftover planning is a premium feature",
            PremiumFeature::NutritionExport => "Nutrition export is a premium feature",
        }
    }
}

/// How an action is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPolicy {
    FamilyMembers,
    PremiumFeature(PremiumFeature),
    Templates,
    Monthly(UsageCounter),
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::CreateMealPlan,
        Action::RegenerateRecipe,
        Action::AddFavorite,
        Action::AddFamilyMember,
        Action::UsePantry,
        Action::UseLeftovers,
        Action::ExportNutrition,
        Action::CreateTemplate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateMealPlan => "create_meal_plan",
            Action::RegenerateRecipe => "regenerate_recipe",
            Action::AddFavorite => "add_favorite",
            Action::AddFamilyMember => "add_family_member",
            Action::UsePantry => "use_pantry",
            Action::UseLeftovers => "use_leftovers",
            Action::ExportNutrition => "export_nutrition",
            Action::CreateTemplate => "create_template",
        }
    }

    pub fn policy(&self) -> ActionPolicy {
        match self {
            Action::AddFamilyMember => ActionPolicy::FamilyMembers,
            Action::UsePantry => ActionPolicy::PremiumFeature(PremiumFeature::Pantry),
            Action::UseLeftovers => ActionPolicy::PremiumFeature(PremiumFeature::Leftovers),
            Action::ExportNutrition => ActionPolicy::PremiumFeature(PremiumFeature::NutritionExport),
            Action::CreateTemplate => ActionPolicy::Templates,
            Action::CreateMealPlan => ActionPolicy::Monthly(UsageCounter::MealPlansGenerated),
            Action::RegenerateRecipe => ActionPolicy::Monthly(UsageCounter::RecipesRegenerated),
            Action::AddFavorite => ActionPolicy::Monthly(UsageCounter::FavoritesCount),
        }
    }

    /// The monthly counter this action consumes, if any.
    pub fn usage_counter(&self) -> Option<UsageCounter> {
        match self.policy() {
            ActionPolicy::Monthly(counter) => Some(counter),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
