use serde::{Deserialize, Serialize};

fn default_diet_type() -> String {
    "general".to_string()
}

/// Dietary preferences the backend uses to personalise an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub health_conditions: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default = "default_diet_type")]
    pub diet_type: String,
    #[serde(default)]
    pub ingredients_to_avoid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub health_conditions: String,
    pub allergies: String,
    pub diet_type: String,
    pub ingredients_to_avoid: String,
}

impl Default for ProfileUpdate {
    fn default() -> Self {
        Self {
            health_conditions: String::new(),
            allergies: String::new(),
            diet_type: default_diet_type(),
            ingredients_to_avoid: String::new(),
        }
    }
}

impl From<&UserProfile> for ProfileUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            health_conditions: profile.health_conditions.clone(),
            allergies: profile.allergies.clone(),
            diet_type: profile.diet_type.clone(),
            ingredients_to_avoid: profile.ingredients_to_avoid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let profile: UserProfile =
            serde_json::from_value(json!({"username": "ana"})).unwrap();
        assert_eq!(profile.diet_type, "general");
        assert!(profile.allergies.is_empty());

        let update = ProfileUpdate::from(&profile);
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({
                "healthConditions": "",
                "allergies": "",
                "dietType": "general",
                "ingredientsToAvoid": ""
            })
        );
    }
}
