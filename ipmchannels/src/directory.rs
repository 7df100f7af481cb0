use crate::Channel;

/// Liste immuable des chaînes, adressée par index.
///
/// Aucune synchronisation n'est nécessaire : le répertoire est construit une
/// fois au démarrage puis partagé en lecture via `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ChannelDirectory {
    channels: Vec<Channel>,
}

impl ChannelDirectory {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Ramène un index quelconque dans `[0, len)` par modulo euclidien.
    ///
    /// `-1` désigne la dernière chaîne. `None` si le répertoire est vide.
    pub fn normalize(&self, index: i64) -> Option<usize> {
        let len = i64::try_from(self.channels.len()).ok()?;
        if len == 0 {
            return None;
        }
        usize::try_from(index.rem_euclid(len)).ok()
    }

    /// Chaînes regroupées par groupe, dans l'ordre de première apparition.
    ///
    /// Chaque chaîne est accompagnée de son index global, utilisable avec
    /// [`ChannelDirectory::get`].
    pub fn groups(&self) -> Vec<(&str, Vec<(usize, &Channel)>)> {
        let mut groups: Vec<(&str, Vec<(usize, &Channel)>)> = Vec::new();

        for (index, channel) in self.channels.iter().enumerate() {
            match groups.iter_mut().find(|(name, _)| *name == channel.group) {
                Some((_, members)) => members.push((index, channel)),
                None => groups.push((channel.group.as_str(), vec![(index, channel)])),
            }
        }

        groups
    }
}

impl From<Vec<Channel>> for ChannelDirectory {
    fn from(channels: Vec<Channel>) -> Self {
        Self::new(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, group: &str) -> Channel {
        Channel {
            name: name.to_string(),
            url: format!("http://stream/{name}"),
            logo: String::new(),
            group: group.to_string(),
        }
    }

    #[test]
    fn normalize_wraps_in_both_directions() {
        let dir = ChannelDirectory::new((0..5).map(|i| channel(&i.to_string(), "G")).collect());
        assert_eq!(dir.normalize(0), Some(0));
        assert_eq!(dir.normalize(5), Some(0));
        assert_eq!(dir.normalize(7), Some(2));
        assert_eq!(dir.normalize(-1), Some(4));
        assert_eq!(dir.normalize(-6), Some(4));
    }

    #[test]
    fn normalize_on_empty_directory_is_none() {
        assert_eq!(ChannelDirectory::default().normalize(3), None);
    }

    #[test]
    fn groups_keep_first_seen_order_and_global_indexes() {
        let dir = ChannelDirectory::new(vec![
            channel("a", "News"),
            channel("b", "Sports"),
            channel("c", "News"),
        ]);

        let groups = dir.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "News");
        let news: Vec<usize> = groups[0].1.iter().map(|(i, _)| *i).collect();
        assert_eq!(news, vec![0, 2]);
        assert_eq!(groups[1].0, "Sports");
        assert_eq!(groups[1].1[0].0, 1);
    }
}
