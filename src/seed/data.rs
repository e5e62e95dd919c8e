use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use log::info;

use crate::logic::{FamilyOperations, RelationshipEditRequest};
use crate::model::{FamilyTree, Gender, Id, NewMember, RelationshipState, UserContext};
use crate::store::traits::Store;

pub const DEMO_TREE_ID: &str = "demo-family";

/// Helper to build a member with a birth year and optional death year
fn person(
    first_name: &str,
    last_name: &str,
    gender: Gender,
    born: i32,
    died: Option<i32>,
) -> Result<NewMember> {
    let date = |year: i32| {
        NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| anyhow!("invalid year {}", year))
    };
    let mut member = NewMember::new(first_name, last_name, gender);
    member.birth_date = Some(date(born)?);
    member.death_date = died.map(date).transpose()?;
    Ok(member)
}

async fn link<S: Store>(
    store: &S,
    tree_id: &Id,
    member_id: &Id,
    proposed: RelationshipState,
    user: &UserContext,
) -> Result<()> {
    let request = RelationshipEditRequest::new(proposed);
    FamilyOperations::edit_relationships(store, tree_id, member_id, request, user).await?;
    Ok(())
}

/// Load a three-generation demo family.
///
/// Every link goes through the same validated edit path as the API.
/// Does nothing when the demo tree already exists.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let tree_id: Id = DEMO_TREE_ID.to_string();
    if store.get_tree(&tree_id).await?.is_some() {
        info!("Demo family already present, skipping seed");
        return Ok(());
    }

    let user = UserContext::system();
    store
        .upsert_tree(FamilyTree::new_with_id(
            tree_id.clone(),
            "The Whitfields".to_string(),
            Some("Demo family with a married-in spouse on each side".to_string()),
            &user,
        ))
        .await?;

    let mut add = Vec::new();
    for input in [
        person("Arthur", "Whitfield", Gender::Male, 1931, Some(2009))?,
        person("Margaret", "Whitfield", Gender::Female, 1934, None)?,
        person("David", "Whitfield", Gender::Male, 1958, None)?,
        person("Elena", "Whitfield", Gender::Female, 1961, None)?,
        person("Susan", "Hale", Gender::Female, 1962, None)?,
        person("James", "Hale", Gender::Male, 1960, None)?,
        person("Lucas", "Whitfield", Gender::Male, 1988, None)?,
        person("Mia", "Whitfield", Gender::Female, 1991, None)?,
        person("Noah", "Hale", Gender::Other, 1994, None)?,
    ] {
        let member = FamilyOperations::create_member(store, &tree_id, input, &user).await?;
        add.push(member.id);
    }
    let [arthur, margaret, david, elena, susan, james, lucas, mia, noah]: [Id; 9] = add
        .try_into()
        .map_err(|_| anyhow!("unexpected number of seed members"))?;

    link(store, &tree_id, &arthur, RelationshipState::new().with_spouse(margaret.clone()), &user).await?;
    for child in [&david, &susan] {
        let parents = RelationshipState::new().with_parents([arthur.clone(), margaret.clone()]);
        link(store, &tree_id, child, parents, &user).await?;
    }

    link(store, &tree_id, &elena, RelationshipState::new().with_spouse(david.clone()), &user).await?;
    link(
        store,
        &tree_id,
        &david,
        RelationshipState::new()
            .with_parents([arthur.clone(), margaret.clone()])
            .with_children([lucas, mia])
            .with_spouse(elena),
        &user,
    )
    .await?;

    link(
        store,
        &tree_id,
        &susan,
        RelationshipState::new()
            .with_parents([arthur, margaret])
            .with_children([noah])
            .with_spouse(james),
        &user,
    )
    .await?;

    info!("Loaded demo family into tree {}", DEMO_TREE_ID);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{BidirectionalSync, LayoutEngine};
    use crate::model::LayoutConfig;
    use crate::store::{InMemoryStore, MemberStore};

    #[tokio::test]
    async fn demo_family_is_consistent_and_laid_out() {
        let store = InMemoryStore::new();
        load_seed_data(&store).await.unwrap();
        // Second load is a no-op
        load_seed_data(&store).await.unwrap();

        let members = store.list_members(&DEMO_TREE_ID.to_string()).await.unwrap();
        assert_eq!(members.len(), 9);
        assert!(BidirectionalSync::check_symmetry(&members).is_empty());

        let layout = LayoutEngine::compute_layout(&members, &LayoutConfig::default());
        assert!(layout.warnings.is_empty());
        let generation = |name: &str| {
            let member = members.iter().find(|m| m.first_name == name).unwrap();
            layout.generation_of(&member.id).unwrap()
        };
        assert_eq!(generation("Arthur"), 0);
        assert_eq!(generation("Elena"), 1);
        assert_eq!(generation("James"), 1);
        assert_eq!(generation("Noah"), 2);
    }
}
