use async_trait::async_trait;
use uuid::Uuid;

use super::{DBClient, StoreError};

#[async_trait]
pub trait HouseholdExt: Send + Sync {
    async fn get_household_id(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    async fn count_family_members(&self, household_id: Uuid) -> Result<i64, StoreError>;

    async fn count_meal_templates(&self, user_id: Uuid) -> Result<i64, StoreError>;
}

#[async_trait]
impl HouseholdExt for DBClient {
    async fn get_household_id(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let household_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM households WHERE owner_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(household_id)
    }

    async fn count_family_members(&self, household_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM family_members WHERE household_id = $1"
        )
        .bind(household_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_meal_templates(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM meal_plan_templates WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
