use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use regex::Regex;
use tracing::{info, warn};

use crate::dag::ProcessorReplacer;
use crate::error::{Error, Result};
use crate::models::{AppId, LifeTime, Processor, ProcessorId, ProcessorPatch};

static TASK_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z_-][a-z.0-9_-]*[a-z0-9_-]$").expect("task class pattern compiles")
});

pub fn is_valid_task_class(value: &str) -> bool {
    !value.is_empty() && TASK_CLASS.is_match(value)
}

/// A positive integer, or `None`.
pub fn parse_parallelism(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|p| *p > 0)
}

/// Unix milliseconds of `date` at `time` (`HH:MM:SS` or `HH:MM`) in `tz`.
fn transition_millis<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: &str) -> Result<i64> {
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .map_err(|err| Error::InvalidInput(format!("transition time {:?}: {}", time, err)))?;
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|at| at.timestamp_millis())
        .ok_or_else(|| Error::InvalidInput(format!("{} {} does not exist locally", date, time)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModifyOptions {
    /// Only the parallelism may be changed.
    pub parallelism: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Replaced,
    Rejected { reason: Option<String> },
}

/// Form for replacing a processor of a running application.
#[derive(Debug, Clone)]
pub struct ProcessorEditForm {
    app_id: AppId,
    original: Processor,
    change_parallelism_only: bool,
    task_class: String,
    description: String,
    parallelism: String,
    transit_time: Option<String>,
    transit_date: Option<String>,
    valid_parallelism: bool,
    valid_task_class: bool,
    submit_failed: bool,
    reason: Option<String>,
    closed: bool,
}

impl ProcessorEditForm {
    pub fn new(app_id: AppId, processor: &Processor, options: ModifyOptions) -> Self {
        ProcessorEditForm {
            app_id,
            change_parallelism_only: options.parallelism,
            task_class: processor.task_class.clone(),
            description: processor.description.clone(),
            parallelism: processor.parallelism.to_string(),
            transit_time: None,
            transit_date: None,
            valid_parallelism: parse_parallelism(&processor.parallelism.to_string()).is_some(),
            valid_task_class: is_valid_task_class(&processor.task_class),
            submit_failed: false,
            reason: None,
            closed: false,
            original: processor.clone(),
        }
    }

    pub fn processor_id(&self) -> ProcessorId {
        self.original.id
    }

    pub fn change_parallelism_only(&self) -> bool {
        self.change_parallelism_only
    }

    pub fn task_class(&self) -> &str {
        &self.task_class
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parallelism(&self) -> &str {
        &self.parallelism
    }

    pub fn transit_time(&self) -> Option<&str> {
        self.transit_time.as_deref()
    }

    pub fn transit_date(&self) -> Option<&str> {
        self.transit_date.as_deref()
    }

    pub fn set_task_class(&mut self, value: &str) {
        self.task_class = value.to_string();
        self.valid_task_class = is_valid_task_class(value);
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = value.to_string();
    }

    pub fn set_parallelism(&mut self, value: &str) {
        self.parallelism = value.to_string();
        self.valid_parallelism = parse_parallelism(value).is_some();
    }

    /// `HH:MM:SS`; empty clears it.
    pub fn set_transit_time(&mut self, value: Option<&str>) {
        self.transit_time = value.filter(|v| !v.trim().is_empty()).map(str::to_string);
    }

    /// `YYYY-MM-DD`; empty clears it.
    pub fn set_transit_date(&mut self, value: Option<&str>) {
        self.transit_date = value.filter(|v| !v.trim().is_empty()).map(str::to_string);
    }

    /// Proposes the application clock as transition time, unless one is set.
    pub fn fill_default_time(&mut self, app_clock: i64) {
        self.fill_default_time_in(&Local, app_clock);
    }

    pub fn fill_default_time_in<Tz>(&mut self, tz: &Tz, app_clock: i64)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if self.transit_time.is_some() {
            return;
        }
        if let Some(at) = tz.timestamp_millis_opt(app_clock).single() {
            self.transit_time = Some(at.format("%H:%M:%S").to_string());
        }
    }

    pub fn is_valid_parallelism(&self) -> bool {
        self.valid_parallelism
    }

    pub fn is_valid_task_class(&self) -> bool {
        self.valid_task_class
    }

    pub fn is_dirty(&self) -> bool {
        self.task_class != self.original.task_class
            || self.description != self.original.description
            || parse_parallelism(&self.parallelism) != Some(self.original.parallelism)
            || self.transit_time.is_some()
            || self.transit_date.is_some()
    }

    pub fn can_replace(&self) -> bool {
        self.valid_parallelism && self.valid_task_class && self.is_dirty()
    }

    /// The replacement as it would be submitted, with a transition time
    /// interpreted in `tz` and missing dates defaulting to `today`.
    pub fn build_patch_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
        today: NaiveDate,
    ) -> Result<ProcessorPatch> {
        let parallelism = parse_parallelism(&self.parallelism).ok_or_else(|| {
            Error::InvalidInput(format!("parallelism {:?}", self.parallelism))
        })?;

        let life = match &self.transit_time {
            Some(time) => {
                let date = match &self.transit_date {
                    Some(date) => NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(
                        |err| Error::InvalidInput(format!("transition date {:?}: {}", date, err)),
                    )?,
                    None => today,
                };
                Some(LifeTime::from_birth(transition_millis(tz, date, time)?))
            }
            None => None,
        };

        Ok(ProcessorPatch {
            task_class: self.task_class.clone(),
            description: self.description.clone(),
            parallelism,
            life,
        })
    }

    /// Sends the replacement. Success closes the form; a rejection keeps it
    /// open with the backend's reason.
    pub async fn submit<R>(&mut self, replacer: &R) -> Result<SubmitOutcome>
    where
        R: ProcessorReplacer + ?Sized,
    {
        let now = Local::now();
        let patch = self.build_patch_in(&Local, now.date_naive())?;
        info!(
            "[EDIT] Replacing processor {} of app {} with {:?}",
            self.processor_id(),
            self.app_id,
            patch
        );
        let outcome = replacer
            .replace_processor(self.app_id, self.processor_id(), &patch)
            .await?;

        self.submit_failed = !outcome.success;
        if outcome.success {
            self.closed = true;
            self.reason = None;
            Ok(SubmitOutcome::Replaced)
        } else {
            warn!("[EDIT] Replacement rejected: {:?}", outcome.reason);
            self.reason = outcome.reason.clone();
            Ok(SubmitOutcome::Rejected {
                reason: outcome.reason,
            })
        }
    }

    pub fn submit_failed(&self) -> bool {
        self.submit_failed
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
