use tracing::info;

use crate::core::helpers::{filter_post_content, new_id, now};
use crate::core::store::KeyValue;
use crate::follow::follow_user;
use crate::models::{Gender, Post, Profile};
use crate::posts::insert_post;
use crate::profiles::{insert_profile, load_profile_for_user};
use crate::users::{find_user_by_username, insert_user};

struct DemoAccount {
    username: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    biography: &'static str,
    gender: Gender,
    posts: &'static [(&'static str, &'static str, &'static str)],
}

const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        username: "alice",
        first_name: "Alice",
        last_name: "Liddell",
        biography: "Hello, I'm Alice!",
        gender: Gender::Female,
        posts: &[
            ("Welcome", "Welcome to my page! Excited to share thoughts here.", "#hello"),
            ("Productive day", "Just finished an amazing project. Feeling productive today!", "#work"),
        ],
    },
    DemoAccount {
        username: "bob",
        first_name: "Bob",
        last_name: "Builder",
        biography: "Bob's corner of the internet",
        gender: Gender::Male,
        posts: &[(
            "Hey everyone",
            "Just joined, looking forward to connecting with you all.",
            "#hello",
        )],
    },
];

/// Creates the demo accounts (password = username) with profiles and posts,
/// and makes alice follow bob. Accounts that already exist are left alone.
pub fn init_demo_data(store: &dyn KeyValue) -> anyhow::Result<()> {
    for account in DEMO_ACCOUNTS {
        let user = match insert_user(store, account.username, account.username)? {
            Some(user) => user,
            None => continue,
        };
        let profile = Profile {
            id: new_id(),
            user_id: user.id.clone(),
            first_name: account.first_name.to_string(),
            last_name: account.last_name.to_string(),
            biography: account.biography.to_string(),
            gender: account.gender,
            following: Vec::new(),
        };
        insert_profile(store, &profile)?;

        for (title, content, hashtag) in account.posts {
            let post = Post {
                id: new_id(),
                profile_id: profile.id.clone(),
                title: title.to_string(),
                content: filter_post_content(content),
                hashtag: hashtag.to_string(),
                created_at: now(),
            };
            insert_post(store, &post)?;
        }

        info!(username = account.username, "seeded demo account");
    }

    // Add "alice" following "bob" relationship
    let alice = find_user_by_username(store, "alice")?;
    let bob = find_user_by_username(store, "bob")?;
    if let (Some(alice), Some(bob)) = (alice, bob) {
        if let Some(mut profile) = load_profile_for_user(store, &alice.id)? {
            follow_user(store, &mut profile, &bob.id)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::follow::followers_of;
    use crate::posts::all_posts;
    use crate::profiles::all_profiles;

    #[test]
    fn seeding_is_idempotent() {
        let store = MemoryStore::new();
        init_demo_data(&store).unwrap();
        init_demo_data(&store).unwrap();

        assert_eq!(all_profiles(&store).unwrap().len(), 2);
        assert_eq!(all_posts(&store).unwrap().len(), 3);

        let bob = find_user_by_username(&store, "bob").unwrap().unwrap();
        let followers = followers_of(&store, &bob.id).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].first_name, "Alice");
    }
}
