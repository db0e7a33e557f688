pub mod auth;
pub mod authors;
pub mod books;
pub mod borrowings;
pub mod health;
pub mod profile;

use actix_web::web;

/// Registers every `/api` resource. The caller mounts this under `/api` and wraps the
/// scope with `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(
        web::scope("/profile")
            .service(profile::get_profile)
            .service(profile::update_profile),
    )
    .service(
        web::scope("/books")
            .service(books::get_books)
            .service(books::create_book)
            .service(books::get_book)
            .service(books::update_book)
            .service(books::delete_book),
    )
    .service(
        web::scope("/authors")
            .service(authors::get_authors)
            .service(authors::create_author)
            .service(authors::get_author)
            .service(authors::update_author)
            .service(authors::delete_author),
    )
    .service(
        web::scope("/borrowings")
            .service(borrowings::get_borrowings)
            .service(borrowings::borrow_book)
            .service(borrowings::get_borrowing)
            .service(borrowings::return_book),
    );
}
