//! Person read handlers.

use crate::mapping::PersonResource;
use crate::model::{EntityId, EntityKind, Person};
use crate::repo::filter::{PAGE_SIZE_DEFAULT, PAGE_SIZE_MAX};
use crate::repo::{Filter, ListQuery, Page, RepoError, UnitOfWork};
use crate::service::dispatch::{HandlerContext, Request};
use crate::service::error::{AppError, AppResult};
use crate::validation::{FieldError, Rules, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPersonById {
    pub id: EntityId,
}

/// Substring filters over persons; blank filters are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPersonsFiltered {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_number: Option<String>,
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for GetPersonsFiltered {
    fn default() -> Self {
        Self {
            first_name: None,
            last_name: None,
            personal_number: None,
            page_number: 1,
            page_size: PAGE_SIZE_DEFAULT,
        }
    }
}

impl GetPersonsFiltered {
    fn filter(&self) -> Filter {
        let criteria = [
            ("name", &self.first_name),
            ("surname", &self.last_name),
            ("personal_number", &self.personal_number),
        ];
        criteria
            .into_iter()
            .filter_map(|(column, value)| {
                let value = value.as_deref()?.trim();
                (!value.is_empty()).then_some((column, value))
            })
            .fold(Filter::new(), |filter, (column, value)| filter.contains(column, value))
    }
}

impl Validate for GetPersonById {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .positive_id("id", "Person identifier", self.id)
            .finish()
    }
}

impl Validate for GetPersonsFiltered {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .check(
                "pageNumber",
                self.page_number >= 1,
                "Page number must be at least 1.",
            )
            .check(
                "pageSize",
                (1..=PAGE_SIZE_MAX).contains(&self.page_size),
                format!("Page size must be between 1 and {PAGE_SIZE_MAX}."),
            )
            .finish()
    }
}

impl Request for GetPersonById {
    type Response = PersonResource;
    const NAME: &'static str = "get_person_by_id";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<PersonResource> {
        uow.repository()
            .get_by_id_with_includes::<Person>(self.id, ctx.cancel)
            .map_err(|err: RepoError| AppError::from_repo("get_person_failed", "Failed to load person", err))?
            .map(PersonResource::from)
            .ok_or(AppError::NotFound {
                entity: EntityKind::Person,
                id: self.id,
            })
    }
}

impl Request for GetPersonsFiltered {
    type Response = Vec<PersonResource>;
    const NAME: &'static str = "get_persons_filtered";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<Vec<PersonResource>> {
        let query = ListQuery::filtered(self.filter()).paged(Page::new(self.page_number, self.page_size));
        let persons = uow
            .repository()
            .find_list_with_includes::<Person>(&query, ctx.cancel)
            .map_err(|err| AppError::from_repo("list_persons_failed", "Failed to list persons", err))?;
        Ok(persons.into_iter().map(PersonResource::from).collect())
    }
}
