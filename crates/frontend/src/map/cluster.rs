//! Marker clustering for the marker pane.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

use efl_shared::wkt::Coordinate;

use super::projection::{project, LatLng, LatLngBounds, PixelPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Pixel distance within which a marker joins an existing cluster.
    pub max_cluster_radius: f64,
    /// From this zoom on, every marker stands alone.
    pub disable_clustering_at_zoom: u8,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            max_cluster_radius: 80.0,
            disable_clustering_at_zoom: 17,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub radius: f64,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl Default for CircleStyle {
    fn default() -> Self {
        CircleStyle {
            radius: 6.0,
            weight: 1.0,
            fill_opacity: 0.9,
        }
    }
}

/// Popup content: the name in bold above the municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLabel {
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub facility_id: i64,
    pub position: Coordinate,
    pub label: MarkerLabel,
    pub style: CircleStyle,
}

impl Marker {
    pub fn lat_lng(&self) -> LatLng {
        self.position.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Position of the first marker that opened the cluster.
    pub center: LatLng,
    /// Indexes into the group's markers.
    pub members: Vec<usize>,
    pub bounds: LatLngBounds,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

/// One cluster-group layer: a fixed set of markers plus per-zoom clusters.
#[derive(Debug)]
pub struct ClusterGroup {
    options: ClusterOptions,
    markers: Vec<Marker>,
    cache: RefCell<HashMap<u8, Rc<[Cluster]>>>,
}

impl ClusterGroup {
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn options(&self) -> ClusterOptions {
        self.options
    }

    pub fn bounds(&self) -> LatLngBounds {
        let mut bounds = LatLngBounds::new();
        for m in &self.markers {
            bounds.extend(m.lat_lng());
        }
        bounds
    }

    /// Clusters at `zoom`, computed once per zoom level.
    pub fn clusters_at(&self, zoom: u8) -> Rc<[Cluster]> {
        if let Some(hit) = self.cache.borrow().get(&zoom) {
            return Rc::clone(hit);
        }
        let clusters: Rc<[Cluster]> = self.compute(zoom).into();
        self.cache.borrow_mut().insert(zoom, Rc::clone(&clusters));
        clusters
    }

    fn compute(&self, zoom: u8) -> Vec<Cluster> {
        let single = zoom >= self.options.disable_clustering_at_zoom;
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut centers: Vec<PixelPoint> = Vec::new();
        for (i, marker) in self.markers.iter().enumerate() {
            let ll = marker.lat_lng();
            let p = project(ll, zoom as f64);
            let joined = if single {
                None
            } else {
                centers
                    .iter()
                    .position(|c| c.distance_to(p) <= self.options.max_cluster_radius)
            };
            match joined {
                Some(idx) => {
                    let cluster = &mut clusters[idx];
                    cluster.members.push(i);
                    cluster.bounds.extend(ll);
                }
                None => {
                    let mut bounds = LatLngBounds::new();
                    bounds.extend(ll);
                    clusters.push(Cluster {
                        center: ll,
                        members: vec![i],
                        bounds,
                    });
                    centers.push(p);
                }
            }
        }
        clusters
    }
}

/// Builds cluster groups. Obtained through [`install`].
#[derive(Debug)]
pub struct ClusterFactory {
    options: ClusterOptions,
}

impl ClusterFactory {
    pub fn options(&self) -> ClusterOptions {
        self.options
    }

    pub fn group(&self, markers: Vec<Marker>) -> ClusterGroup {
        ClusterGroup {
            options: self.options,
            markers,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

static FACTORY: OnceLock<ClusterFactory> = OnceLock::new();

/// Enable clustering. Safe to call any number of times; every call returns
/// the same factory.
pub fn install() -> &'static ClusterFactory {
    FACTORY.get_or_init(|| {
        tracing::debug!("marker clustering installed");
        ClusterFactory {
            options: ClusterOptions::default(),
        }
    })
}
