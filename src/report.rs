use crate::api_client::TwitterApiClient;
use crate::dto::{TwitterList, User};
use crate::error::TwitterError;
use std::collections::HashSet;
use tracing::info;

/// Followed users that appear in none of the given lists, in follow order.
/// Each user is reported at most once even if the friends pages overlap.
pub fn followed_not_in_lists<'a>(followed: &'a [User], listed_ids: &HashSet<u64>) -> Vec<&'a User> {
    let mut reported = HashSet::new();
    followed
        .iter()
        .filter(|user| !listed_ids.contains(&user.id))
        .filter(|user| reported.insert(user.id))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnlistedReport {
    pub lists: Vec<TwitterList>,
    pub unlisted: Vec<User>,
}

impl UnlistedReport {
    pub fn list_lines(&self) -> Vec<String> {
        self.lists
            .iter()
            .map(|list| format!("{} {}", list.id, list.name))
            .collect()
    }

    pub fn user_lines(&self) -> Vec<String> {
        self.unlisted
            .iter()
            .map(|user| {
                format!(
                    "user {} not in any lists (id={} name={})",
                    user.screen_name, user.id, user.name
                )
            })
            .collect()
    }
}

pub async fn build_report(
    client: &TwitterApiClient,
    user_id: u64,
) -> Result<UnlistedReport, TwitterError> {
    let lists = client.lists(user_id).await?;
    info!("Found {} lists for user {}", lists.len(), user_id);

    let mut listed_ids = HashSet::new();
    for list in &lists {
        let members = client.list_members(list).await?;
        info!("List {} has {} members", list.slug, members.len());
        listed_ids.extend(members.iter().map(|member| member.id));
    }

    let followed = client.friends().await?;
    info!("Following {} users", followed.len());

    let unlisted = followed_not_in_lists(&followed, &listed_ids)
        .into_iter()
        .cloned()
        .collect();

    Ok(UnlistedReport { lists, unlisted })
}
