//! Read-only queries about the field data a server can provide.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::channel::FieldChannel;
use crate::error::Result;
use crate::Float;

use super::SurfaceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRangeRequest {
    pub field_name: String,
    pub node_value: bool,
    pub surface_ids: Vec<SurfaceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFieldInfo {
    pub display_name: String,
    pub solver_name: String,
    pub section: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFieldInfo {
    pub display_name: String,
    pub x_component: String,
    pub y_component: String,
    pub z_component: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceInfo {
    pub surface_name: String,
    pub surface_ids: Vec<SurfaceId>,
    pub zone_id: i32,
    pub zone_type: String,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Catalogue and range queries, keyed by display or surface name in the
/// order the server reports them.
pub struct FieldInfo {
    channel: Arc<dyn FieldChannel>,
}

impl FieldInfo {
    pub fn new(channel: Arc<dyn FieldChannel>) -> Self {
        FieldInfo { channel }
    }

    /// Minimum and maximum of a field over the given surfaces. An empty
    /// surface list lets the server pick the whole domain.
    pub fn get_range(
        &self,
        field: &str,
        node_value: bool,
        surface_ids: &[SurfaceId],
    ) -> Result<(Float, Float)> {
        debug!("get_range: {} on {:?}", field, surface_ids);
        self.channel.get_range(GetRangeRequest {
            field_name: field.to_string(),
            node_value,
            surface_ids: surface_ids.to_vec(),
        })
    }

    pub fn get_fields_info(&self) -> Result<LinkedHashMap<String, ScalarFieldInfo>> {
        Ok(self
            .channel
            .get_fields_info()?
            .into_iter()
            .map(|info| (info.display_name.clone(), info))
            .collect())
    }

    pub fn get_vector_fields_info(&self) -> Result<LinkedHashMap<String, VectorFieldInfo>> {
        Ok(self
            .channel
            .get_vector_fields_info()?
            .into_iter()
            .map(|info| (info.display_name.clone(), info))
            .collect())
    }

    pub fn get_surfaces_info(&self) -> Result<LinkedHashMap<String, SurfaceInfo>> {
        Ok(self
            .channel
            .get_surfaces_info()?
            .into_iter()
            .map(|info| (info.surface_name.clone(), info))
            .collect())
    }
}
