use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobType {
    #[default]
    Standard,
    Swarm,
}

impl JobType {
    /// Anything other than the literal `SWARM` is handled as a standard job.
    pub fn parse(raw: &str) -> Self {
        if raw == "SWARM" {
            JobType::Swarm
        } else {
            JobType::Standard
        }
    }
}

/// A job as listed by the marketplace. Fields are read leniently: the listing
/// is not under our control and a malformed field must not poison the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub job_type: JobType,
    pub prompt: String,
    pub budget: Option<Value>,
    pub budget_per_agent: Option<Value>,
}

impl Job {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: raw.get("id").map(scalar_to_string).unwrap_or_default(),
            job_type: raw
                .get("jobType")
                .and_then(Value::as_str)
                .map(JobType::parse)
                .unwrap_or_default(),
            prompt: raw
                .get("prompt")
                .map(scalar_to_string)
                .unwrap_or_default(),
            budget: raw.get("budget").filter(|v| !v.is_null()).cloned(),
            budget_per_agent: raw.get("budgetPerAgent").filter(|v| !v.is_null()).cloned(),
        }
    }

    /// Budget this agent would earn. Uncoercible values count as zero so that
    /// a malformed listing is treated as under-priced.
    pub fn effective_budget(&self) -> f64 {
        let raw = match self.job_type {
            JobType::Swarm => self.budget_per_agent.as_ref(),
            JobType::Standard => self.budget.as_ref(),
        };
        raw.and_then(coerce_decimal).unwrap_or(0.0)
    }
}

pub fn coerce_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Stringify a JSON scalar the way it would be printed; `null` becomes empty.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_reads_swarm_job() {
        let job = Job::from_value(&json!({
            "id": "3",
            "jobType": "SWARM",
            "budgetPerAgent": 3.0,
            "budget": 9.0,
            "prompt": "swarm task"
        }));
        assert_eq!(job.id, "3");
        assert_eq!(job.job_type, JobType::Swarm);
        assert_eq!(job.prompt, "swarm task");
        assert_eq!(job.effective_budget(), 3.0);
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let job = Job::from_value(&json!({ "id": 42 }));
        assert_eq!(job.id, "42");
        assert_eq!(job.job_type, JobType::Standard);
        assert_eq!(job.prompt, "");
    }

    #[test]
    fn missing_or_null_id_is_empty() {
        assert_eq!(Job::from_value(&json!({ "prompt": "x" })).id, "");
        assert_eq!(Job::from_value(&json!({ "id": null })).id, "");
    }

    #[test]
    fn effective_budget_coerces_strings() {
        let job = Job::from_value(&json!({ "id": "1", "budget": " 2.50 " }));
        assert_eq!(job.effective_budget(), 2.5);
    }

    #[test]
    fn effective_budget_defaults_to_zero() {
        let garbage = Job::from_value(&json!({ "id": "1", "budget": "a lot" }));
        assert_eq!(garbage.effective_budget(), 0.0);

        let missing = Job::from_value(&json!({ "id": "1" }));
        assert_eq!(missing.effective_budget(), 0.0);

        let not_a_number = Job::from_value(&json!({ "id": "1", "budget": "NaN" }));
        assert_eq!(not_a_number.effective_budget(), 0.0);

        let object = Job::from_value(&json!({ "id": "1", "budget": { "usd": 5 } }));
        assert_eq!(object.effective_budget(), 0.0);
    }

    #[test]
    fn swarm_without_per_agent_budget_is_zero() {
        let job = Job::from_value(&json!({ "id": "1", "jobType": "SWARM", "budget": 10 }));
        assert_eq!(job.effective_budget(), 0.0);
    }

    #[test]
    fn unknown_job_type_is_standard() {
        let job = Job::from_value(&json!({ "id": "1", "jobType": "AUCTION", "budget": 1 }));
        assert_eq!(job.job_type, JobType::Standard);
        assert_eq!(job.effective_budget(), 1.0);
    }
}
