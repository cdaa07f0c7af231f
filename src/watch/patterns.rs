// src/watch/patterns.rs

use std::fmt;

use anyhow::Context;
use globset::GlobSet;

use crate::config::BuildContext;
use crate::engine::WatchTarget;
use crate::errors::Result;
use crate::tasks::BuildStep;
use crate::tasks::sources::build_globset;

/// Compiled include/exclude globs bound to what they trigger.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths such as `"src/styles/a.scss"` into [`matches`](Self::matches).
#[derive(Clone)]
pub struct WatchRegistration {
    target: WatchTarget,
    watch_set: GlobSet,
    exclude_set: GlobSet,
}

impl fmt::Debug for WatchRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistration")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl WatchRegistration {
    pub fn new(target: WatchTarget, watch: &[String], exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for {target:?}"))?;
        let exclude_set = build_globset(exclude)
            .with_context(|| format!("building exclude globset for {target:?}"))?;
        Ok(Self {
            target,
            watch_set,
            exclude_set,
        })
    }

    pub fn target(&self) -> WatchTarget {
        self.target
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path) && !self.exclude_set.is_match(rel_path)
    }
}

/// Registrations for every asset group, plus the server and output root
/// when `include_serve` is set and `[serve]` is configured.
///
/// Group sources never match inside the output root or the state
/// directory, so a build can't retrigger itself.
pub fn build_registrations(ctx: &BuildContext, include_serve: bool) -> Result<Vec<WatchRegistration>> {
    let output_glob = format!("{}/**", ctx.output_rel().trim_end_matches('/'));
    let generated = vec![output_glob.clone(), ".assetpipe/**".to_string()];
    let mut registrations = Vec::new();

    for group in ctx.config().groups() {
        let mut watch = group.src.clone();
        if let Some(order) = &group.order {
            watch.extend(order.iter().map(|p| p.to_string_lossy().replace('\\', "/")));
        }
        let mut exclude = group.exclude.clone();
        exclude.extend(generated.iter().cloned());

        registrations.push(WatchRegistration::new(
            WatchTarget::Rebuild(BuildStep::for_group(group.kind)),
            &watch,
            &exclude,
        )?);
    }

    if include_serve {
        if let Some(serve) = &ctx.config().serve {
            registrations.push(WatchRegistration::new(
                WatchTarget::RestartServer,
                &serve.watch,
                &generated,
            )?);
            registrations.push(WatchRegistration::new(
                WatchTarget::PushAsset,
                &[output_glob],
                &[],
            )?);
        }
    }

    Ok(registrations)
}

/// Everything a change to `rel_path` should trigger, in registration order.
pub fn route_change(registrations: &[WatchRegistration], rel_path: &str) -> Vec<WatchTarget> {
    let mut targets = Vec::new();
    for registration in registrations {
        if registration.matches(rel_path) && !targets.contains(&registration.target) {
            targets.push(registration.target);
        }
    }
    targets
}
