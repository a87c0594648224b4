use crate::auth::Authenticated;
use crate::{renders, views, Page};

pub async fn home(auth: Authenticated) -> Page {
    renders(views::home_page(&auth.user.username))
}

pub async fn about(auth: Authenticated) -> Page {
    renders(views::about_page(&auth.user.username))
}
