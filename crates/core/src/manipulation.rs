//! Annotation manipulation handles and operations
//!
//! Provides the corner handles shown on the active annotation and the two
//! direct-manipulation operations the select tool supports: moving and
//! corner resizing.

use crate::annotation::{Annotation, AnnotationId, PagePoint, PageRect};

/// Corner of a box, named by compass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeCorner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl ResizeCorner {
    /// Hit-test order for overlapping handles
    pub const ALL: [ResizeCorner; 4] = [
        ResizeCorner::NorthWest,
        ResizeCorner::NorthEast,
        ResizeCorner::SouthWest,
        ResizeCorner::SouthEast,
    ];

    /// Short name as used by handle styling (`nw`, `ne`, `sw`, `se`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeCorner::NorthWest => "nw",
            ResizeCorner::NorthEast => "ne",
            ResizeCorner::SouthWest => "sw",
            ResizeCorner::SouthEast => "se",
        }
    }

    fn is_west(&self) -> bool {
        matches!(self, ResizeCorner::NorthWest | ResizeCorner::SouthWest)
    }

    fn is_north(&self) -> bool {
        matches!(self, ResizeCorner::NorthWest | ResizeCorner::NorthEast)
    }

    /// This corner's position on a box
    pub fn position(&self, rect: &PageRect) -> PagePoint {
        let x = if self.is_west() { rect.x } else { rect.right() };
        let y = if self.is_north() { rect.y } else { rect.bottom() };
        PagePoint::new(x, y)
    }

    /// The diagonally opposite corner, which stays fixed while this one moves
    pub fn anchor(&self, rect: &PageRect) -> PagePoint {
        let x = if self.is_west() { rect.right() } else { rect.x };
        let y = if self.is_north() { rect.bottom() } else { rect.y };
        PagePoint::new(x, y)
    }
}

/// Resize handle with position and type
#[derive(Debug, Clone, Copy)]
pub struct ManipulationHandle {
    pub corner: ResizeCorner,

    /// Handle center in page coordinates
    pub position: PagePoint,

    /// Half the side of the square hit zone, in page units
    pub radius: f32,

    /// Associated annotation ID
    pub annotation_id: AnnotationId,
}

impl ManipulationHandle {
    pub fn new(
        corner: ResizeCorner,
        position: PagePoint,
        radius: f32,
        annotation_id: AnnotationId,
    ) -> Self {
        Self {
            corner,
            position,
            radius,
            annotation_id,
        }
    }

    /// Check if a point falls inside this handle's square hit zone
    pub fn hit_test(&self, point: &PagePoint) -> bool {
        (point.x - self.position.x).abs() <= self.radius
            && (point.y - self.position.y).abs() <= self.radius
    }
}

/// Generate the corner handles for an annotation
///
/// Point-only annotations (comments) have no handles.
pub fn generate_handles(annotation: &Annotation, radius: f32) -> Vec<ManipulationHandle> {
    if !annotation.is_resizable() {
        return Vec::new();
    }

    let bounds = annotation.bounds();
    ResizeCorner::ALL
        .iter()
        .map(|corner| {
            ManipulationHandle::new(*corner, corner.position(&bounds), radius, annotation.id())
        })
        .collect()
}

/// First handle whose hit zone contains the point
pub fn hit_handle<'a>(
    handles: &'a [ManipulationHandle],
    point: &PagePoint,
) -> Option<&'a ManipulationHandle> {
    handles.iter().find(|handle| handle.hit_test(point))
}

/// Box produced by dragging `corner` to `pointer` while `anchor` stays fixed
///
/// Each axis takes the signed distance from the anchor in the corner's
/// direction, floored at `min_size`. The origin is then recomputed from the
/// anchor, so a floored west or north edge never moves the opposite edge.
pub fn resize_from_corner(
    anchor: PagePoint,
    corner: ResizeCorner,
    pointer: PagePoint,
    min_size: f32,
) -> PageRect {
    let width = if corner.is_west() {
        anchor.x - pointer.x
    } else {
        pointer.x - anchor.x
    }
    .max(min_size);
    let height = if corner.is_north() {
        anchor.y - pointer.y
    } else {
        pointer.y - anchor.y
    }
    .max(min_size);

    let x = if corner.is_west() { anchor.x - width } else { anchor.x };
    let y = if corner.is_north() { anchor.y - height } else { anchor.y };
    PageRect::new(x, y, width, height)
}

/// Active manipulation of one annotation
#[derive(Debug, Clone, PartialEq)]
pub enum ManipulationState {
    /// Moving the whole annotation; `last_position` is the previous pointer
    /// sample so every move applies only the incremental delta
    Drag {
        annotation_id: AnnotationId,
        last_position: PagePoint,
    },
    /// Dragging one corner; `anchor` is the opposite corner at press time
    Resize {
        annotation_id: AnnotationId,
        corner: ResizeCorner,
        anchor: PagePoint,
    },
}

impl ManipulationState {
    pub fn drag(annotation_id: AnnotationId, start: PagePoint) -> Self {
        ManipulationState::Drag {
            annotation_id,
            last_position: start,
        }
    }

    pub fn resize(annotation_id: AnnotationId, corner: ResizeCorner, bounds: &PageRect) -> Self {
        ManipulationState::Resize {
            annotation_id,
            corner,
            anchor: corner.anchor(bounds),
        }
    }

    pub fn annotation_id(&self) -> AnnotationId {
        match self {
            ManipulationState::Drag { annotation_id, .. }
            | ManipulationState::Resize { annotation_id, .. } => *annotation_id,
        }
    }

    /// Advance to a new pointer sample and return the updated annotation
    pub fn apply(&mut self, annotation: &Annotation, pointer: PagePoint, min_size: f32) -> Annotation {
        match self {
            ManipulationState::Drag { last_position, .. } => {
                let dx = pointer.x - last_position.x;
                let dy = pointer.y - last_position.y;
                *last_position = pointer;
                annotation.translated(dx, dy)
            }
            ManipulationState::Resize { corner, anchor, .. } => {
                annotation.with_bounds(resize_from_corner(*anchor, *corner, pointer, min_size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;
    use crate::annotation::Color;

    fn highlight_at(rect: PageRect) -> Annotation {
        Annotation::from_parts(
            AnnotationId::new_v4(),
            1,
            AnnotationKind::Highlight { bounds: rect },
            Color::AMBER,
        )
    }

    #[test]
    fn test_handle_hit_test_is_square() {
        let handle = ManipulationHandle::new(
            ResizeCorner::NorthWest,
            PagePoint::new(100.0, 100.0),
            7.5,
            AnnotationId::new_v4(),
        );

        // Corner of the square zone is inside even though it is beyond the radius
        assert!(handle.hit_test(&PagePoint::new(107.5, 92.5)));
        assert!(!handle.hit_test(&PagePoint::new(108.0, 100.0)));
    }

    #[test]
    fn test_generate_handles_for_box() {
        let annotation = highlight_at(PageRect::new(10.0, 20.0, 100.0, 50.0));
        let handles = generate_handles(&annotation, 7.5);
        assert_eq!(handles.len(), 4);

        let se = handles.iter().find(|h| h.corner == ResizeCorner::SouthEast).unwrap();
        assert_eq!(se.position, PagePoint::new(110.0, 70.0));
        assert_eq!(
            hit_handle(&handles, &PagePoint::new(12.0, 22.0)).map(|h| h.corner),
            Some(ResizeCorner::NorthWest)
        );
    }

    #[test]
    fn test_comments_have_no_handles() {
        let comment = Annotation::from_parts(
            AnnotationId::new_v4(),
            1,
            AnnotationKind::Comment { anchor: PagePoint::new(5.0, 5.0), content: "c".into() },
            Color::AMBER,
        );
        assert!(generate_handles(&comment, 7.5).is_empty());
    }

    #[test]
    fn test_resize_each_corner_keeps_anchor() {
        let rect = PageRect::new(100.0, 100.0, 100.0, 50.0);

        for corner in ResizeCorner::ALL {
            let anchor = corner.anchor(&rect);
            let pointer = corner.position(&rect);
            let moved = match corner {
                ResizeCorner::NorthWest => pointer.offset(-10.0, -10.0),
                ResizeCorner::NorthEast => pointer.offset(10.0, -10.0),
                ResizeCorner::SouthWest => pointer.offset(-10.0, 10.0),
                ResizeCorner::SouthEast => pointer.offset(10.0, 10.0),
            };
            let resized = resize_from_corner(anchor, corner, moved, 20.0);
            assert_eq!(resized.width, 110.0, "{}", corner.as_str());
            assert_eq!(resized.height, 60.0, "{}", corner.as_str());
            assert_eq!(corner.anchor(&resized), anchor, "{}", corner.as_str());
        }
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let rect = PageRect::new(10.0, 10.0, 100.0, 100.0);
        let corner = ResizeCorner::SouthEast;
        let resized = resize_from_corner(corner.anchor(&rect), corner, PagePoint::new(15.0, 60.0), 20.0);
        assert_eq!(resized, PageRect::new(10.0, 10.0, 20.0, 50.0));

        // Dragging a west corner past the anchor floors at the minimum on the anchor's left
        let corner = ResizeCorner::NorthWest;
        let resized = resize_from_corner(corner.anchor(&rect), corner, PagePoint::new(200.0, 200.0), 20.0);
        assert_eq!(resized, PageRect::new(90.0, 90.0, 20.0, 20.0));
    }

    #[test]
    fn test_drag_accumulates_incremental_deltas() {
        let mut annotation = highlight_at(PageRect::new(10.0, 10.0, 40.0, 40.0));
        let mut state = ManipulationState::drag(annotation.id(), PagePoint::new(20.0, 20.0));

        for pointer in [
            PagePoint::new(25.0, 20.0),
            PagePoint::new(25.0, 25.0),
            PagePoint::new(23.0, 23.0),
        ] {
            annotation = state.apply(&annotation, pointer, 20.0);
        }

        assert_eq!(annotation.bounds().origin(), PagePoint::new(13.0, 13.0));
        assert_eq!(annotation.bounds().width, 40.0);
    }

    #[test]
    fn test_resize_state_uses_anchor_from_press() {
        let annotation = highlight_at(PageRect::new(0.0, 0.0, 50.0, 50.0));
        let mut state =
            ManipulationState::resize(annotation.id(), ResizeCorner::NorthWest, &annotation.bounds());

        let resized = state.apply(&annotation, PagePoint::new(-10.0, 10.0), 20.0);
        assert_eq!(resized.bounds(), PageRect::new(-10.0, 10.0, 60.0, 40.0));
        assert_eq!(state.annotation_id(), annotation.id());
    }
}
