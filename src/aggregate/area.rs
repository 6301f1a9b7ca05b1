use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CalcContext, Profile, ProfileRequest, Spend};
use crate::error::CalcError;

/// Profiles of everything reported under a service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaProfile {
    pub id: Uuid,
    pub name: String,
    /// Keyed `work-item:<id>` or `work-item-group:<id>`.
    pub work_items: BTreeMap<String, Profile>,
}

/// Profile a service area: its visible work items that are not in a group,
/// plus the groups whose members resolve to the area. `only` narrows the
/// ungrouped work items to the given ids.
pub fn area_profile(
    ctx: &CalcContext<'_>,
    area_id: Uuid,
    request: &ProfileRequest,
    only: Option<&[Uuid]>,
) -> Result<AreaProfile, CalcError> {
    let area = ctx.snapshot.area(area_id)?;
    let grouped = ctx.snapshot.grouped_ids();

    let mut work_items = BTreeMap::new();
    let items = ctx.snapshot.work_items().filter(|item| {
        item.area_id == Some(area_id)
            && ctx.snapshot.is_visible(item)
            && !grouped.contains(&item.id)
            && only.is_none_or(|ids| ids.contains(&item.id))
    });
    for item in items {
        work_items.insert(item.subject().to_string(), item.profile(ctx, request)?);
    }

    for group in ctx.snapshot.groups() {
        if group.area(ctx)?.is_some_and(|a| a.id == area_id) {
            work_items.insert(group.subject().to_string(), group.profile(ctx, request)?);
        }
    }

    tracing::debug!("Profiled area {} with {} entries", area.name, work_items.len());
    Ok(AreaProfile {
        id: area.id,
        name: area.name.clone(),
        work_items,
    })
}
