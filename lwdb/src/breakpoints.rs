// Breakpoint table
//
// One breakpoint per source line. Every entry mirrors exactly one enabled request
// on the execution controller: the request is enabled before the entry is inserted
// and deleted before the entry is dropped.

use crate::error::CommandError;
use crate::model::{ClassHandle, Location, RequestHandle};
use crate::target::{ExecutionControl, TargetError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub line: u32,
    pub location: Location,
    pub request: RequestHandle,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct BreakpointTable {
    entries: BTreeMap<u32, Breakpoint>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `line` in `class`, enable a breakpoint there and record it
    ///
    /// A line that already has a breakpoint is rejected without touching the target.
    pub async fn set<T>(
        &mut self,
        target: &mut T,
        class: ClassHandle,
        line: u32,
    ) -> Result<&Breakpoint, CommandError>
    where
        T: ExecutionControl + ?Sized,
    {
        if self.entries.contains_key(&line) {
            return Err(CommandError::DuplicateBreakpoint(line));
        }

        let location = match target.locations_of_line(class, line).await {
            Ok(locations) => locations.into_iter().next(),
            Err(TargetError::NoSuchElement(_)) => None,
            Err(e) => return Err(e.into()),
        }
        .ok_or(CommandError::NoLocationForLine(line))?;

        let request = target.enable_breakpoint(&location).await?;
        debug!("Breakpoint request {} enabled at {}", request, location);

        let breakpoint = Breakpoint {
            line,
            location,
            request,
            enabled: true,
        };

        Ok(self.entries.entry(line).or_insert(breakpoint))
    }

    /// Delete the breakpoint at `line`; `Ok(false)` when there is none
    pub async fn delete<T>(&mut self, target: &mut T, line: u32) -> Result<bool, TargetError>
    where
        T: ExecutionControl + ?Sized,
    {
        let Some(breakpoint) = self.entries.get(&line) else {
            return Ok(false);
        };

        match target.delete_breakpoint(breakpoint.request).await {
            Ok(()) => {}
            // Already gone on the target side; the entry is stale either way
            Err(TargetError::NoSuchElement(reason)) => {
                warn!("Breakpoint request {} already cleared: {}", breakpoint.request, reason)
            }
            Err(e) => return Err(e),
        }

        self.entries.remove(&line);
        Ok(true)
    }

    /// Breakpoints ordered by line
    pub fn list(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.values()
    }

    pub fn get(&self, line: u32) -> Option<&Breakpoint> {
        self.entries.get(&line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry without touching the target (the target is gone)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
