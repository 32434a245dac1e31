//! In-memory view of the track table

use crate::{
    domain::track::{Track, TrackId},
    storage::{
        error::StorageError,
        records::{MetadataStore, Order},
    },
};

/// Who a listing is produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every record
    Admin,
    /// Records not explicitly unpublished
    Visitor,
}

#[derive(Debug, Default, Clone)]
pub struct TrackList {
    tracks: Vec<Track>,
    order: Order,
}

impl TrackList {
    /// Empty list, loaded newest first
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: Order) -> Self {
        Self {
            tracks: Vec::new(),
            order,
        }
    }

    /// Replaces the list with the store's records in the list's order.
    ///
    /// On error the previous list is kept.
    pub fn load(&mut self, store: &impl MetadataStore) -> Result<&[Track], StorageError> {
        self.tracks = store.select(self.order)?;
        Ok(&self.tracks)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn find(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Drops a track locally, returns whether it was present
    pub fn remove(&mut self, id: TrackId) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != id);
        self.tracks.len() != before
    }

    /// Tracks whose title or description contains `query`, ignoring case
    pub fn filter(&self, query: &str) -> Vec<&Track> {
        filter_tracks(self.tracks.iter(), query)
    }

    /// Tracks shown to visitors
    pub fn visible(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_visible())
    }

    pub fn listing(&self, audience: Audience, query: &str) -> Vec<&Track> {
        match audience {
            Audience::Admin => self.filter(query),
            Audience::Visitor => filter_tracks(self.visible(), query),
        }
    }
}

fn filter_tracks<'a>(tracks: impl Iterator<Item = &'a Track>, query: &str) -> Vec<&'a Track> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tracks.collect();
    }

    tracks
        .filter(|t| {
            format!("{} {}", t.title, t.description)
                .to_lowercase()
                .contains(&query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::track::TrackId,
        library::{
            list::{Audience, TrackList},
            testing::{FakeRecords, track},
        },
        storage::{error::StorageError, records::Order},
    };

    fn ids<'a>(tracks: impl IntoIterator<Item = &'a crate::domain::track::Track>) -> Vec<i64> {
        tracks.into_iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn load_orders_newest_first() {
        let store = FakeRecords::with_tracks(vec![track(1, "A"), track(2, "B"), track(3, "C")]);
        let mut list = TrackList::new();

        let loaded = list.load(&store).unwrap();

        assert_eq!(ids(loaded), vec![3, 2, 1]);
    }

    #[test]
    fn failed_load_keeps_previous_list() {
        let store = FakeRecords::with_tracks(vec![track(1, "A")]);
        let mut list = TrackList::new();
        list.load(&store).unwrap();

        store.fail_select(true);
        let err = list.load(&store).unwrap_err();

        assert!(matches!(err, StorageError::Internal(_)));
        assert_eq!(ids(list.tracks()), vec![1]);
    }

    #[test]
    fn visitor_view_hides_unpublished() {
        let mut a = track(1, "A");
        a.published = Some(true);
        let mut b = track(2, "B");
        b.published = Some(false);
        let store = FakeRecords::with_tracks(vec![a, b]);

        let mut list = TrackList::new();
        list.load(&store).unwrap();

        assert_eq!(ids(list.visible()), vec![1]);
        assert_eq!(ids(list.listing(Audience::Visitor, "")), vec![1]);
        assert_eq!(ids(list.listing(Audience::Admin, "")), vec![2, 1]);
    }

    #[test]
    fn missing_published_flag_is_visible() {
        let mut legacy = track(1, "Legacy");
        legacy.published = None;
        let store = FakeRecords::with_tracks(vec![legacy]);

        let mut list = TrackList::new();
        list.load(&store).unwrap();

        assert_eq!(ids(list.visible()), vec![1]);
    }

    #[test]
    fn filter_matches_title_and_description_ignoring_case() {
        let mut talk = track(1, "Friday Talk");
        talk.description = "Recorded at the Mosque".to_string();
        let store = FakeRecords::with_tracks(vec![talk, track(2, "Morning Recitation")]);

        let mut list = TrackList::new();
        list.load(&store).unwrap();

        assert_eq!(ids(list.filter("friday")), vec![1]);
        assert_eq!(ids(list.filter("MOSQUE")), vec![1]);
        assert_eq!(ids(list.filter("  recitation ")), vec![2]);
        assert_eq!(ids(list.filter("")), vec![2, 1]);
        assert!(list.filter("nothing like this").is_empty());
    }

    #[test]
    fn visitor_listing_filters_within_visible_tracks() {
        let mut hidden = track(1, "Talk one");
        hidden.published = Some(false);
        let store = FakeRecords::with_tracks(vec![hidden, track(2, "Talk two")]);

        let mut list = TrackList::new();
        list.load(&store).unwrap();

        assert_eq!(ids(list.listing(Audience::Visitor, "talk")), vec![2]);
    }

    #[test]
    fn list_with_order_loads_oldest_first() {
        let store = FakeRecords::with_tracks(vec![track(1, "A"), track(2, "B")]);
        let mut list = TrackList::with_order(Order::OldestFirst);

        list.load(&store).unwrap();

        assert_eq!(ids(list.tracks()), vec![1, 2]);
    }

    #[test]
    fn remove_drops_only_the_given_track() {
        let store = FakeRecords::with_tracks(vec![track(1, "A"), track(2, "B")]);
        let mut list = TrackList::new();
        list.load(&store).unwrap();

        assert!(list.remove(TrackId(1)));
        assert!(!list.remove(TrackId(1)));
        assert_eq!(ids(list.tracks()), vec![2]);
        assert!(list.find(TrackId(2)).is_some());
        assert_eq!(list.tracks().len(), 1);
    }
}
